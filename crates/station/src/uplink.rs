//! Envio dos relatórios via UDP (broadcast ou unicast).

use std::collections::VecDeque;
use std::net::UdpSocket;

use airquality_core::config::UplinkConfig;
use airquality_core::protocol::{ProtocolError, encode_report};
use airquality_core::types::AirQualityReport;
use tracing::{debug, info, warn};

/// Erros do uplink.
#[derive(Debug, thiserror::Error)]
pub enum UplinkError {
    #[error("Falha ao criar socket UDP em {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Erro ao enviar UDP: {0}")]
    Send(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Destino dos relatórios decodificados.
pub trait ReportSink {
    /// Entrega um relatório. Retorna quantos bytes saíram.
    fn deliver(&mut self, report: &AirQualityReport) -> Result<usize, UplinkError>;

    /// Relatórios aguardando reenvio.
    fn pending(&self) -> usize {
        0
    }
}

/// Sink usado quando o uplink está desligado.
#[derive(Debug, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn deliver(&mut self, _report: &AirQualityReport) -> Result<usize, UplinkError> {
        Ok(0)
    }
}

/// Uplink UDP com fila de reenvio limitada.
pub struct UdpUplink {
    sock: UdpSocket,
    dest_addr: String,
    /// Datagramas que falharam, do mais antigo ao mais novo
    backlog: VecDeque<Vec<u8>>,
    backlog_limit: usize,
}

impl UdpUplink {
    pub fn new(cfg: &UplinkConfig) -> Result<Self, UplinkError> {
        let bind_addr = if cfg.bind_ip.is_empty() {
            "0.0.0.0:0".to_string()
        } else {
            format!("{}:0", cfg.bind_ip)
        };
        let sock = UdpSocket::bind(&bind_addr).map_err(|source| UplinkError::Bind {
            addr: bind_addr,
            source,
        })?;

        if cfg.mode == "broadcast" || cfg.dest_ip == "255.255.255.255" {
            sock.set_broadcast(true)?;
            info!("Modo BROADCAST ativado");
        } else {
            info!("Modo UNICAST → {}", cfg.dest_ip);
        }

        Ok(Self {
            sock,
            dest_addr: format!("{}:{}", cfg.dest_ip, cfg.port),
            backlog: VecDeque::new(),
            backlog_limit: cfg.backlog_limit,
        })
    }

    pub fn dest_addr(&self) -> &str {
        &self.dest_addr
    }

    /// Reenvia a fila pendente; para no primeiro erro.
    fn flush_backlog(&mut self) -> Result<(), UplinkError> {
        while let Some(packet) = self.backlog.front() {
            self.sock.send_to(packet, &self.dest_addr)?;
            self.backlog.pop_front();
        }
        Ok(())
    }

    fn enqueue(&mut self, packet: Vec<u8>) {
        if self.backlog_limit == 0 {
            return;
        }
        if self.backlog.len() >= self.backlog_limit {
            self.backlog.pop_front();
            debug!("Fila de reenvio cheia, descartando relatório mais antigo");
        }
        self.backlog.push_back(packet);
    }
}

impl ReportSink for UdpUplink {
    fn pending(&self) -> usize {
        self.backlog.len()
    }

    fn deliver(&mut self, report: &AirQualityReport) -> Result<usize, UplinkError> {
        let packet = encode_report(report)?;

        if !self.backlog.is_empty() {
            let before = self.backlog.len();
            if let Err(e) = self.flush_backlog() {
                self.enqueue(packet);
                return Err(e);
            }
            info!("{before} relatórios pendentes reenviados");
        }

        match self.sock.send_to(&packet, &self.dest_addr) {
            Ok(sent) => Ok(sent),
            Err(e) => {
                warn!(
                    "Relatório #{} guardado para reenvio ({} na fila)",
                    report.sequence,
                    self.backlog.len() + 1
                );
                self.enqueue(packet);
                Err(e.into())
            }
        }
    }
}
