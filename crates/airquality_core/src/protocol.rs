//! Datagramas UDP da estação.
//!
//! Cada relatório sai num datagrama próprio, precedido por dois bytes de
//! cabeçalho:
//!
//! ```text
//!  byte 0      byte 1      bytes 2..
//! [ 0x41 'A' ][ versão  ][ AirQualityReport (bincode) ]
//! ```
//!
//! Receptores devem ignorar datagramas com outro prefixo ou versão.

use crate::types::AirQualityReport;

/// Primeiro byte de todo datagrama da estação.
pub const MAGIC_BYTE: u8 = 0x41; // 'A'

/// Versão do layout do [`AirQualityReport`].
pub const PROTOCOL_VERSION: u8 = 1;

const HEADER: [u8; 2] = [MAGIC_BYTE, PROTOCOL_VERSION];

/// Falhas ao montar ou interpretar um datagrama.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Datagrama com {0} bytes não tem cabeçalho completo")]
    TooShort(usize),

    #[error("Prefixo 0x{0:02X} não é de relatório da estação")]
    InvalidMagic(u8),

    #[error("Versão de relatório não suportada: v{0}")]
    VersionMismatch(u8),

    #[error("Falha ao serializar relatório: {0}")]
    Serialize(String),

    #[error("Corpo do relatório corrompido: {0}")]
    Deserialize(String),
}

/// Monta o datagrama de um relatório.
pub fn encode_report(report: &AirQualityReport) -> Result<Vec<u8>, ProtocolError> {
    let mut packet = HEADER.to_vec();
    bincode::serialize_into(&mut packet, report)
        .map_err(|e| ProtocolError::Serialize(e.to_string()))?;
    Ok(packet)
}

/// Interpreta um datagrama recebido; o cabeçalho é conferido antes do corpo.
pub fn decode_report(data: &[u8]) -> Result<AirQualityReport, ProtocolError> {
    let body = match data {
        [MAGIC_BYTE, PROTOCOL_VERSION, body @ ..] => body,
        [MAGIC_BYTE, version, ..] => return Err(ProtocolError::VersionMismatch(*version)),
        [magic, _, ..] => return Err(ProtocolError::InvalidMagic(*magic)),
        short => return Err(ProtocolError::TooShort(short.len())),
    };

    bincode::deserialize(body).map_err(|e| ProtocolError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
