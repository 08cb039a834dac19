//! Leitura da UART do sensor.
//!
//! Erros de I/O ficam aqui: um timeout é uma leitura vazia, qualquer outro erro
//! fecha a porta para ser reaberta no próximo ciclo. O decodificador só vê bytes.

use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use airquality_core::config::SerialConfig;
use serialport::SerialPort;
use tracing::{info, warn};

/// Erros da porta serial.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Falha ao abrir {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    #[error("Erro de leitura: {0}")]
    Io(#[from] std::io::Error),
}

/// Porta serial com reabertura automática.
pub struct SerialSource {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
    /// Instante do último erro (controla o atraso de reabertura)
    last_failure: Option<Instant>,
}

impl SerialSource {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            port: None,
            last_failure: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Abre a porta e aguarda o tempo de estabilização.
    pub fn open(&mut self) -> Result<(), SerialError> {
        let port = serialport::new(&self.config.device, self.config.baud_rate)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .open()
            .map_err(|source| SerialError::Open {
                device: self.config.device.clone(),
                source,
            })?;

        info!(
            "Porta {} aberta ({} baud)",
            self.config.device, self.config.baud_rate
        );
        std::thread::sleep(Duration::from_secs_f64(self.config.settle_secs));

        self.port = Some(port);
        self.last_failure = None;
        Ok(())
    }

    /// Lê até `read_size` bytes. Retorna um chunk vazio se a porta está
    /// fechada (aguardando reabertura) ou se a leitura expirou.
    pub fn read_chunk(&mut self) -> Vec<u8> {
        if self.port.is_none() && self.reopen_due() {
            if let Err(e) = self.open() {
                warn!("{e}. Tentando novamente em {:.1}s...", self.config.reopen_delay_secs);
                self.last_failure = Some(Instant::now());
            }
        }

        let Some(port) = self.port.as_mut() else {
            return Vec::new();
        };

        let mut buf = vec![0u8; self.config.read_size];
        match read_available(port, &mut buf) {
            Ok(n) => {
                buf.truncate(n);
                buf
            }
            Err(e) => {
                warn!("{e}. Fechando {}", self.config.device);
                self.port = None;
                self.last_failure = Some(Instant::now());
                Vec::new()
            }
        }
    }

    fn reopen_due(&self) -> bool {
        match self.last_failure {
            Some(at) => at.elapsed() >= Duration::from_secs_f64(self.config.reopen_delay_secs),
            None => true,
        }
    }
}

/// Uma leitura: timeout e interrupção contam como zero bytes.
pub fn read_available<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<usize, SerialError> {
    match reader.read(buf) {
        Ok(n) => Ok(n),
        Err(ref e)
            if e.kind() == ErrorKind::TimedOut
                || e.kind() == ErrorKind::WouldBlock
                || e.kind() == ErrorKind::Interrupted =>
        {
            Ok(0)
        }
        Err(e) => Err(SerialError::Io(e)),
    }
}
