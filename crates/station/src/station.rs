//! Ciclo de processamento: bytes da UART → decodificador → relatórios.

use std::time::{SystemTime, UNIX_EPOCH};

use airquality_core::aqi::{AlertLevel, level_for_aqi};
use airquality_core::config::AlertThresholds;
use airquality_core::decoder::{DecodeOutcome, FrameDecoder};
use airquality_core::types::{AirQualityReport, Measurement};
use tracing::{debug, error, info, warn};

use crate::uplink::ReportSink;

/// Contadores de resultados desde o início.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounters {
    pub decoded: u64,
    pub overruns: u64,
    pub invalid_length: u64,
    pub checksum_mismatch: u64,
    pub delivered: u64,
    pub delivery_failures: u64,
}

impl OutcomeCounters {
    fn record(&mut self, outcome: &DecodeOutcome) {
        match outcome {
            DecodeOutcome::Decoded(_) => self.decoded += 1,
            DecodeOutcome::BufferOverrun { .. } => self.overruns += 1,
            DecodeOutcome::InvalidLength(_) => self.invalid_length += 1,
            DecodeOutcome::ChecksumMismatch { .. } => self.checksum_mismatch += 1,
        }
    }

    /// Total de resultados de erro.
    pub fn errors(&self) -> u64 {
        self.overruns + self.invalid_length + self.checksum_mismatch
    }
}

/// Estado da estação para uma conexão serial.
pub struct Station<S: ReportSink> {
    decoder: FrameDecoder,
    sink: S,
    thresholds: AlertThresholds,
    counters: OutcomeCounters,
    next_sequence: u32,
    last_level: AlertLevel,
}

impl<S: ReportSink> Station<S> {
    pub fn new(sink: S, thresholds: AlertThresholds) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            sink,
            thresholds,
            counters: OutcomeCounters::default(),
            next_sequence: 0,
            last_level: AlertLevel::Normal,
        }
    }

    pub fn counters(&self) -> OutcomeCounters {
        self.counters
    }

    /// Processa um chunk lido da porta; retorna os relatórios gerados.
    pub fn handle_chunk(&mut self, chunk: &[u8]) -> Vec<AirQualityReport> {
        let outcomes: Vec<DecodeOutcome> = self.decoder.ingest(chunk).collect();
        let mut reports = Vec::new();

        for outcome in outcomes {
            self.counters.record(&outcome);
            match outcome {
                DecodeOutcome::Decoded(m) => {
                    let report = self.publish(m);
                    reports.push(report);
                }
                other => warn!("Frame descartado: {other}"),
            }
        }

        reports
    }

    fn publish(&mut self, measurement: Measurement) -> AirQualityReport {
        let report = AirQualityReport::new(self.next_sequence, now_ms(), measurement);
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let m = &report.measurement;
        debug!(
            "#{} PM1.0 {} | PM2.5 {} | PM10 {} µg/m³ (env) | AQI {} ({})",
            report.sequence,
            m.pm1_0_env,
            m.pm2_5_env,
            m.pm10_env,
            report.aqi.overall,
            report.aqi.category.label()
        );
        debug!(
            "#{} partículas/0.1L: >0.3µm {} | >0.5µm {} | >1.0µm {} | >2.5µm {} | >5.0µm {} | >10µm {}",
            report.sequence,
            m.particles_03um,
            m.particles_05um,
            m.particles_10um,
            m.particles_25um,
            m.particles_50um,
            m.particles_100um
        );

        self.check_alert(report.aqi.overall);

        match self.sink.deliver(&report) {
            Ok(sent) => {
                self.counters.delivered += 1;
                debug!("→ {sent} bytes (relatório #{})", report.sequence);
            }
            Err(e) => {
                self.counters.delivery_failures += 1;
                error!("{e}");
            }
        }

        report
    }

    /// Loga só quando o nível muda, para não repetir o alerta a cada frame.
    fn check_alert(&mut self, aqi: u16) {
        let level = level_for_aqi(aqi, &self.thresholds);
        if level == self.last_level {
            return;
        }
        match level {
            AlertLevel::Critical => error!("AQI {aqi}: nível CRÍTICO"),
            AlertLevel::Warning => warn!("AQI {aqi}: nível de atenção"),
            AlertLevel::Normal => info!("AQI {aqi}: voltou ao normal"),
        }
        self.last_level = level;
    }

    /// Resumo periódico dos contadores.
    pub fn log_summary(&self) {
        let c = self.counters();
        info!(
            "Frames: {} OK | {} erros (overrun {}, tamanho {}, checksum {}) | enviados {} | falhas {} | pendentes {}",
            c.decoded,
            c.errors(),
            c.overruns,
            c.invalid_length,
            c.checksum_mismatch,
            c.delivered,
            c.delivery_failures,
            self.sink.pending()
        );
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
