//! # Air Quality Core
//!
//! Crate compartilhada da estação de qualidade do ar: decodificação dos frames
//! UART do sensor de partículas, cálculo de AQI, protocolo binário dos
//! relatórios (bincode) e configuração TOML.
//!
//! ## Módulos
//! - [`frame`] – Layout do frame de 32 bytes e checksum
//! - [`decoder`] – Decodificador em fluxo com resync e recuperação
//! - [`types`] – Medição e relatório
//! - [`aqi`] – AQI (escala EPA) e níveis de alerta
//! - [`protocol`] – Encode/decode binário com magic byte
//! - [`config`] – Configuração unificada via TOML

pub mod aqi;
pub mod config;
pub mod decoder;
pub mod frame;
pub mod protocol;
pub mod types;

// Re-exports convenientes
pub use config::AppConfig;
pub use decoder::{DecodeOutcome, FrameDecoder};
pub use protocol::{PROTOCOL_VERSION, decode_report, encode_report};
pub use types::{AirQualityReport, Measurement};
