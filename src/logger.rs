//! Process-wide `log` backend with colored console lines for development and
//! JSON lines for production.

use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::RwLock;
use std::time::{Duration, Instant};

static LOGGER: Lazy<ConsoleLogger> = Lazy::new(ConsoleLogger::default);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Install the logger once. A second call fails and leaves the running
/// configuration untouched.
pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    log::set_logger(&*LOGGER).map_err(|e| format!("Logger already installed: {}", e))?;

    let filter = config.filter;
    LOGGER.reconfigure(config);
    log::set_max_level(filter);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored, one line per record.
    Pretty,
    Plain,
    /// One JSON object per line.
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub filter: LevelFilter,
    pub format: LogFormat,
    pub show_location: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            filter: LevelFilter::Info,
            format: LogFormat::Pretty,
            show_location: false,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: LevelFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn development() -> Self {
        Self {
            filter: LevelFilter::Debug,
            format: LogFormat::Pretty,
            show_location: true,
        }
    }

    pub fn production() -> Self {
        Self {
            filter: LevelFilter::Info,
            format: LogFormat::Json,
            show_location: false,
        }
    }

    /// `development()` unless `APP_ENV=production`; `RUST_LOG` overrides the level.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("APP_ENV").ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
        )
    }

    fn from_vars(app_env: Option<&str>, rust_log: Option<&str>) -> Self {
        let base = match app_env {
            Some("production") => Self::production(),
            _ => Self::development(),
        };
        match rust_log.and_then(|name| name.trim().parse::<LevelFilter>().ok()) {
            Some(filter) => base.with_filter(filter),
            None => base,
        }
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: DateTime<Utc>,
    level: &'a str,
    target: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Cyan,
    }
}

#[derive(Default)]
pub struct ConsoleLogger {
    config: RwLock<LoggerConfig>,
}

impl ConsoleLogger {
    pub fn reconfigure(&self, config: LoggerConfig) {
        if let Ok(mut current) = self.config.write() {
            *current = config;
        }
    }

    fn render(config: &LoggerConfig, record: &Record, now: DateTime<Utc>) -> String {
        let location = config.show_location.then(|| {
            format!(
                "{}:{}",
                record.file().unwrap_or("?"),
                record.line().unwrap_or(0)
            )
        });

        match config.format {
            LogFormat::Json => {
                let line = JsonLine {
                    timestamp: now,
                    level: record.level().as_str(),
                    target: record.target(),
                    message: record.args().to_string(),
                    location,
                };
                serde_json::to_string(&line).unwrap_or_default()
            }
            LogFormat::Plain => {
                let mut line = format!(
                    "{} [{}] {}: {}",
                    now.format(TIMESTAMP_FORMAT),
                    record.level(),
                    record.target(),
                    record.args()
                );
                if let Some(location) = location {
                    line.push_str(&format!(" ({})", location));
                }
                line
            }
            LogFormat::Pretty => {
                let level = record.level();
                let mut line = format!(
                    "{} [{}] {}: {}",
                    now.format(TIMESTAMP_FORMAT).to_string().bright_black(),
                    level.as_str().color(level_color(level)).bold(),
                    record.target().bright_blue(),
                    record.args()
                );
                if let Some(location) = location {
                    line.push_str(&format!(" ({})", location).bright_black().to_string());
                }
                line
            }
        }
    }
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.config
            .read()
            .map(|config| metadata.level() <= config.filter)
            .unwrap_or(true)
    }

    fn log(&self, record: &Record) {
        let Ok(config) = self.config.read() else {
            return;
        };
        if record.level() > config.filter {
            return;
        }
        let line = Self::render(&config, record, Utc::now());
        let _ = writeln!(io::stdout().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

/// Logs how long a named operation took when dropped.
pub struct Timer {
    label: String,
    started: Instant,
}

impl Timer {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!("⏱️  {} took {}ms", self.label, self.elapsed().as_millis());
    }
}

pub fn timer(label: impl Into<String>) -> Timer {
    let label = label.into();
    log::debug!("⏱️  {} started", label);
    Timer {
        label,
        started: Instant::now(),
    }
}

pub fn log_startup_info(app_name: &str, version: &str, port: u16) {
    log::info!("🚀 {} v{} starting on port {}", app_name, version, port);
}

pub fn log_config_info(config: &crate::config::Config) {
    let key = if config.gemini.api_key.is_some() { "set" } else { "missing" };
    log::info!("🎨 Gemini model {} (API key {})", config.gemini.model_id, key);

    if config.supabase.is_configured() {
        log::info!("☁️  Blob storage bucket '{}'", config.supabase.bucket);
    } else {
        log::info!("💾 Blob storage not configured, images stay on local disk");
    }
    log::info!(
        "📁 Local images in {} (retain {})",
        config.local.images_dir().display(),
        config.local.retention_limit
    );
    log::info!(
        "📚 Batches of {} (max {}), {}ms apart",
        config.pipeline.default_batch_size,
        config.pipeline.max_batch_size,
        config.pipeline.batch_delay.as_millis()
    );
}
