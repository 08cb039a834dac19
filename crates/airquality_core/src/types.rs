//! Definição de tipos/structs da estação.
//!
//! [`Measurement`] espelha os 13 campos do payload do sensor; o
//! [`AirQualityReport`] é o que a estação envia pela rede.

use serde::{Deserialize, Serialize};

use crate::aqi::AqiReading;
use crate::frame::{PAYLOAD_FIELDS, PAYLOAD_OFFSET, read_u16};

// ──────────────────────────────────────────────
// Medição
// ──────────────────────────────────────────────

/// Uma medição completa decodificada de um frame válido.
///
/// Concentrações em µg/m³; contagens em partículas por 0,1 L de ar.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Measurement {
    /// PM1.0, unidade padrão (CF=1)
    pub pm1_0_standard: u16,
    /// PM2.5, unidade padrão (CF=1)
    pub pm2_5_standard: u16,
    /// PM10, unidade padrão (CF=1)
    pub pm10_standard: u16,
    /// PM1.0, unidade ambiental
    pub pm1_0_env: u16,
    /// PM2.5, unidade ambiental
    pub pm2_5_env: u16,
    /// PM10, unidade ambiental
    pub pm10_env: u16,
    /// Partículas > 0,3 µm
    pub particles_03um: u16,
    /// Partículas > 0,5 µm
    pub particles_05um: u16,
    /// Partículas > 1,0 µm
    pub particles_10um: u16,
    /// Partículas > 2,5 µm
    pub particles_25um: u16,
    /// Partículas > 5,0 µm
    pub particles_50um: u16,
    /// Partículas > 10 µm
    pub particles_100um: u16,
    /// Palavra reservada (repassada sem interpretação)
    pub reserved: u16,
}

impl Measurement {
    /// Decodifica os 13 campos big-endian do payload, na ordem do protocolo.
    pub fn from_payload(payload: &[u8; PAYLOAD_FIELDS * 2]) -> Self {
        let f = |i: usize| read_u16(payload, i * 2);
        Self {
            pm1_0_standard: f(0),
            pm2_5_standard: f(1),
            pm10_standard: f(2),
            pm1_0_env: f(3),
            pm2_5_env: f(4),
            pm10_env: f(5),
            particles_03um: f(6),
            particles_05um: f(7),
            particles_10um: f(8),
            particles_25um: f(9),
            particles_50um: f(10),
            particles_100um: f(11),
            reserved: f(12),
        }
    }

    /// Decodifica o payload de um frame de 32 bytes já validado.
    pub(crate) fn from_frame(frame: &[u8]) -> Self {
        let mut payload = [0u8; PAYLOAD_FIELDS * 2];
        payload.copy_from_slice(&frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + PAYLOAD_FIELDS * 2]);
        Self::from_payload(&payload)
    }

    /// Campos na ordem do protocolo.
    pub fn to_fields(&self) -> [u16; PAYLOAD_FIELDS] {
        [
            self.pm1_0_standard,
            self.pm2_5_standard,
            self.pm10_standard,
            self.pm1_0_env,
            self.pm2_5_env,
            self.pm10_env,
            self.particles_03um,
            self.particles_05um,
            self.particles_10um,
            self.particles_25um,
            self.particles_50um,
            self.particles_100um,
            self.reserved,
        ]
    }
}

// ──────────────────────────────────────────────
// Relatório enviado pela rede
// ──────────────────────────────────────────────

/// Relatório transmitido via UDP para cada medição decodificada.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AirQualityReport {
    /// Número de sequência (incrementa a cada medição)
    pub sequence: u32,
    /// Instante da decodificação (ms desde UNIX epoch)
    pub timestamp_ms: u64,
    pub measurement: Measurement,
    pub aqi: AqiReading,
}

impl AirQualityReport {
    /// Monta o relatório calculando o AQI da medição.
    pub fn new(sequence: u32, timestamp_ms: u64, measurement: Measurement) -> Self {
        Self {
            sequence,
            timestamp_ms,
            aqi: AqiReading::from_measurement(&measurement),
            measurement,
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_fields_in_protocol_order() {
        let mut payload = [0u8; 26];
        for i in 0..13u16 {
            payload[i as usize * 2..i as usize * 2 + 2].copy_from_slice(&(i + 1).to_be_bytes());
        }
        let m = Measurement::from_payload(&payload);

        assert_eq!(m.pm1_0_standard, 1);
        assert_eq!(m.pm10_standard, 3);
        assert_eq!(m.pm2_5_env, 5);
        assert_eq!(m.particles_03um, 7);
        assert_eq!(m.particles_100um, 12);
        assert_eq!(m.reserved, 13);
        assert_eq!(m.to_fields(), core::array::from_fn(|i| i as u16 + 1));
    }

    #[test]
    fn report_carries_aqi() {
        let m = Measurement {
            pm2_5_env: 12,
            pm10_env: 54,
            ..Default::default()
        };
        let report = AirQualityReport::new(7, 1_700_000_000_000, m);
        assert_eq!(report.sequence, 7);
        assert_eq!(report.aqi.overall, 50);
    }
}
