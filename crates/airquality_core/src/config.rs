//! Configuração unificada via TOML.
//!
//! Um único `config.toml` ao lado do executável; seções ausentes usam os
//! valores padrão.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuração da porta serial do sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Dispositivo (ex: "/dev/ttyS0", "COM3")
    pub device: String,
    /// Baud rate da UART
    pub baud_rate: u32,
    /// Timeout de leitura (ms)
    pub timeout_ms: u64,
    /// Bytes lidos por ciclo
    pub read_size: usize,
    /// Espera após abrir a porta antes da primeira leitura (segundos)
    pub settle_secs: f64,
    /// Intervalo entre leituras (segundos)
    pub poll_interval_secs: f64,
    /// Espera antes de reabrir a porta após erro (segundos)
    pub reopen_delay_secs: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyS0".into(),
            baud_rate: 9600,
            timeout_ms: 250,
            read_size: 32,
            settle_secs: 1.0,
            poll_interval_secs: 1.0,
            reopen_delay_secs: 2.0,
        }
    }
}

/// Configuração do envio de relatórios via UDP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    pub enabled: bool,
    /// Modo de envio: "broadcast" ou "unicast"
    pub mode: String,
    /// IP de destino (255.255.255.255 para broadcast)
    pub dest_ip: String,
    /// Porta UDP
    pub port: u16,
    /// IP local para bind (vazio = auto)
    pub bind_ip: String,
    /// Relatórios guardados para reenvio quando o envio falha
    pub backlog_limit: usize,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: "broadcast".into(),
            dest_ip: "255.255.255.255".into(),
            port: 5006,
            bind_ip: String::new(),
            backlog_limit: 64,
        }
    }
}

/// Thresholds de alerta (AQI).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub aqi_warning: u16,
    pub aqi_critical: u16,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            aqi_warning: 101,
            aqi_critical: 201,
        }
    }
}

/// Configuração de logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filtro padrão quando `RUST_LOG` não está definido
    pub level: String,
    /// Resumo dos contadores a cada N leituras (0 = desligado)
    pub summary_every: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            summary_every: 60,
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub uplink: UplinkConfig,
    pub alerts: AlertThresholds,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.serial.device.trim().is_empty() {
            errors.push("Dispositivo serial não pode ser vazio".into());
        }
        if self.serial.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }
        if self.serial.read_size == 0 || self.serial.read_size > MAX_READ_SIZE {
            errors.push(format!(
                "read_size inválido: {} (1–{MAX_READ_SIZE})",
                self.serial.read_size
            ));
        }
        // NaN e inf passam em comparações simples; `Duration::from_secs_f64` entra em pânico.
        check_secs(&mut errors, "poll_interval_secs", self.serial.poll_interval_secs, 0.1, 3600.0);
        check_secs(&mut errors, "settle_secs", self.serial.settle_secs, 0.0, MAX_WAIT_SECS);
        check_secs(&mut errors, "reopen_delay_secs", self.serial.reopen_delay_secs, 0.0, MAX_WAIT_SECS);
        if self.uplink.enabled && self.uplink.port == 0 {
            errors.push("Porta do uplink não pode ser 0".into());
        }
        if self.uplink.mode != "broadcast" && self.uplink.mode != "unicast" {
            errors.push(format!(
                "Modo de uplink inválido: {} (broadcast/unicast)",
                self.uplink.mode
            ));
        }
        if self.alerts.aqi_warning > self.alerts.aqi_critical {
            errors.push(format!(
                "aqi_warning ({}) maior que aqi_critical ({})",
                self.alerts.aqi_warning, self.alerts.aqi_critical
            ));
        }

        errors
    }
}

/// Maior leitura aceita por ciclo (bytes).
pub const MAX_READ_SIZE: usize = 4096;

/// Maior espera aceita para estabilização/reabertura (segundos).
pub const MAX_WAIT_SECS: f64 = 600.0;

fn check_secs(errors: &mut Vec<String>, name: &str, value: f64, min: f64, max: f64) {
    if !value.is_finite() || value < min || value > max {
        errors.push(format!("{name} inválido: {value} ({min}–{max})"));
    }
}
