//! # Air Quality Station
//!
//! Lê o sensor de partículas pela UART, decodifica os frames e envia os
//! relatórios (PM + AQI) via UDP.
//!
//! ## Uso
//! ```bash
//! airquality_station                          # config.toml ao lado do executável
//! airquality_station --config /etc/aq.toml    # config explícita
//! ```

mod serial;
mod station;
mod uplink;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use airquality_core::config::AppConfig;
use serial::SerialSource;
use station::Station;
use tracing::{error, info, warn};
use uplink::{NullSink, ReportSink, UdpUplink};

fn main() {
    // ── Carregar config ──
    let config_path = config_path_from_args().unwrap_or_else(AppConfig::default_path);

    // ── Logging ──
    // O filtro do config só é conhecido depois da leitura; RUST_LOG tem prioridade.
    let level = peek_log_level(&config_path);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .init();

    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config inválida: {e}");
        }
        std::process::exit(2);
    }

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌫  ESTAÇÃO DE QUALIDADE DO AR – ATIVA");
    println!("══════════════════════════════════════════════");
    println!("  Sensor:    {} @ {} baud", config.serial.device, config.serial.baud_rate);
    println!("  Intervalo: {:.1}s", config.serial.poll_interval_secs);
    if config.uplink.enabled {
        println!(
            "  Destino:   {}:{} ({})",
            config.uplink.dest_ip, config.uplink.port, config.uplink.mode
        );
        println!("  Protocolo: bincode v{}", airquality_core::PROTOCOL_VERSION);
    } else {
        println!("  Uplink:    desligado");
    }
    println!("══════════════════════════════════════════════");
    println!();

    // ── Uplink ──
    if config.uplink.enabled {
        match UdpUplink::new(&config.uplink) {
            Ok(uplink) => {
                info!("Uplink UDP → {}", uplink.dest_addr());
                run(&config, uplink);
            }
            Err(e) => {
                error!("{e}");
                std::process::exit(1);
            }
        }
    } else {
        run(&config, NullSink);
    }
}

/// Loop principal: lê, decodifica e envia, no intervalo configurado.
fn run<S: ReportSink>(config: &AppConfig, sink: S) {
    let interval = Duration::from_secs_f64(config.serial.poll_interval_secs);
    let summary_every = config.logging.summary_every;

    let mut source = SerialSource::new(config.serial.clone());
    let mut station = Station::new(sink, config.alerts.clone());

    info!("Lendo sensor...");

    let mut polls: u64 = 0;
    loop {
        let cycle_start = Instant::now();

        let chunk = source.read_chunk();
        station.handle_chunk(&chunk);

        polls += 1;
        if summary_every > 0 && polls % summary_every == 0 {
            station.log_summary();
            if !source.is_open() {
                warn!("Sensor desconectado ({})", config.serial.device);
            }
        }

        // Dormir pelo tempo restante do intervalo
        let elapsed = cycle_start.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }
}

/// `--config <path>` ou `--config=<path>`.
fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Lê só o nível de log do arquivo, antes do subscriber existir.
fn peek_log_level(path: &std::path::Path) -> String {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| toml::from_str::<AppConfig>(&content).ok())
        .map(|c| c.logging.level)
        .unwrap_or_else(|| "info".into())
}
