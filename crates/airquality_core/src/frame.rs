//! Layout do frame UART do sensor de partículas.
//!
//! Formato do frame (32 bytes, big-endian):
//!
//! ```text
//! ┌──────────┬──────────┬────────────┬──────────────────────┬──────────────┐
//! │ 0x42 (1) │ 0x4D (1) │ Tam. (2)   │ Payload 13 × u16 (26)│ Checksum (2) │
//! └──────────┴──────────┴────────────┴──────────────────────┴──────────────┘
//! ```
//!
//! - Tamanho fixo `0x001C` (28 = payload + checksum)
//! - Checksum = soma simples (mod 65536) dos bytes 0..=29, não é CRC

use crate::types::Measurement;

/// Primeiro byte mágico do início de frame.
pub const START_BYTE_1: u8 = 0x42; // 'B'

/// Segundo byte mágico do início de frame.
pub const START_BYTE_2: u8 = 0x4D; // 'M'

/// Tamanho total de um frame.
pub const FRAME_LEN: usize = 32;

/// Valor esperado no campo de tamanho.
pub const FRAME_LENGTH_FIELD: u16 = 28;

/// Número de campos u16 no payload.
pub const PAYLOAD_FIELDS: usize = 13;

/// Offset do payload dentro do frame.
pub(crate) const PAYLOAD_OFFSET: usize = 4;

/// Offset do checksum dentro do frame.
pub(crate) const CHECKSUM_OFFSET: usize = 30;

/// Soma (mod 65536) de uma fatia de bytes.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Lê um u16 big-endian no offset dado.
pub(crate) fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

/// Monta um frame válido (magic, tamanho, payload e checksum) a partir de uma
/// medição.
pub fn encode_frame(m: &Measurement) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = START_BYTE_1;
    frame[1] = START_BYTE_2;
    frame[2..4].copy_from_slice(&FRAME_LENGTH_FIELD.to_be_bytes());

    for (i, value) in m.to_fields().iter().enumerate() {
        let at = PAYLOAD_OFFSET + i * 2;
        frame[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }

    let sum = checksum(&frame[..CHECKSUM_OFFSET]);
    frame[CHECKSUM_OFFSET..].copy_from_slice(&sum.to_be_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_wraps_at_u16() {
        let bytes = [0xFFu8; 300];
        let expected = (300u32 * 0xFF % 65536) as u16;
        assert_eq!(checksum(&bytes), expected);
    }

    #[test]
    fn encoded_frame_layout() {
        let m = Measurement {
            pm1_0_standard: 0x0102,
            particles_100um: 0xABCD,
            ..Default::default()
        };
        let frame = encode_frame(&m);

        assert_eq!(&frame[..4], &[0x42, 0x4D, 0x00, 0x1C]);
        assert_eq!(&frame[4..6], &[0x01, 0x02]);
        // Campo 12 (partículas > 10 µm) fica no offset 4 + 11 * 2
        assert_eq!(&frame[26..28], &[0xAB, 0xCD]);
        assert_eq!(read_u16(&frame, CHECKSUM_OFFSET), checksum(&frame[..30]));
    }
}
