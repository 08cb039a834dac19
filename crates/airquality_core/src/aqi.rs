//! Índice de qualidade do ar (AQI, escala US EPA) e níveis de alerta.
//!
//! Usa as concentrações *ambientais* de PM2.5 e PM10; o AQI final é o maior
//! dos dois sub-índices.

use crate::config::AlertThresholds;
use crate::types::Measurement;
use serde::{Deserialize, Serialize};

/// Valor máximo da escala.
pub const AQI_MAX: u16 = 500;

/// Faixa da tabela EPA: (conc. baixa, conc. alta, índice baixo, índice alto).
type Breakpoint = (f32, f32, u16, u16);

const PM25_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 350.4, 301, 400),
    (350.5, 500.4, 401, 500),
];

const PM10_BREAKPOINTS: [Breakpoint; 7] = [
    (0.0, 54.0, 0, 50),
    (55.0, 154.0, 51, 100),
    (155.0, 254.0, 101, 150),
    (255.0, 354.0, 151, 200),
    (355.0, 424.0, 201, 300),
    (425.0, 504.0, 301, 400),
    (505.0, 604.0, 401, 500),
];

/// Categoria do AQI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AqiCategory {
    #[default]
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Categoria correspondente a um valor de AQI.
    pub fn from_aqi(aqi: u16) -> Self {
        match aqi {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthyForSensitiveGroups,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Bom",
            AqiCategory::Moderate => "Moderado",
            AqiCategory::UnhealthyForSensitiveGroups => "Insalubre p/ sensíveis",
            AqiCategory::Unhealthy => "Insalubre",
            AqiCategory::VeryUnhealthy => "Muito insalubre",
            AqiCategory::Hazardous => "Perigoso",
        }
    }
}

/// AQI calculado para uma medição.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AqiReading {
    /// Sub-índice de PM2.5
    pub pm2_5: u16,
    /// Sub-índice de PM10
    pub pm10: u16,
    /// Maior dos sub-índices
    pub overall: u16,
    pub category: AqiCategory,
}

impl AqiReading {
    /// Calcula o AQI a partir das concentrações ambientais.
    pub fn from_measurement(m: &Measurement) -> Self {
        let pm2_5 = aqi_pm25(m.pm2_5_env);
        let pm10 = aqi_pm10(m.pm10_env);
        let overall = pm2_5.max(pm10);
        Self {
            pm2_5,
            pm10,
            overall,
            category: AqiCategory::from_aqi(overall),
        }
    }
}

/// Sub-índice de PM2.5 (µg/m³).
pub fn aqi_pm25(concentration: u16) -> u16 {
    interpolate(&PM25_BREAKPOINTS, f32::from(concentration))
}

/// Sub-índice de PM10 (µg/m³).
pub fn aqi_pm10(concentration: u16) -> u16 {
    interpolate(&PM10_BREAKPOINTS, f32::from(concentration))
}

fn interpolate(table: &[Breakpoint], c: f32) -> u16 {
    // Concentrações inteiras caem entre faixas (ex: 12 < c < 12.1), então a
    // busca usa o limite superior de cada faixa.
    for &(c_lo, c_hi, i_lo, i_hi) in table {
        if c <= c_hi {
            let c = c.max(c_lo);
            let i = f32::from(i_hi - i_lo) / (c_hi - c_lo) * (c - c_lo) + f32::from(i_lo);
            // Empate arredonda para o par (ex: 12.5 → 12)
            return i.round_ties_even() as u16;
        }
    }
    AQI_MAX
}

// ──────────────────────────────────────────────
// Alertas
// ──────────────────────────────────────────────

/// Nível de alerta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Normal,
    Warning,
    Critical,
}

/// Retorna o [`AlertLevel`] para um AQI dado os thresholds.
pub fn level_for_aqi(aqi: u16, thresholds: &AlertThresholds) -> AlertLevel {
    if aqi >= thresholds.aqi_critical {
        AlertLevel::Critical
    } else if aqi >= thresholds.aqi_warning {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}
