use std::io;
use std::path::PathBuf;
use std::sync::Once;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// Global initialization guard
static INIT: Once = Once::new();

/// Application component identifier
pub enum Component {
    StoreHost,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::StoreHost => "store_host",
        }
    }
}

/// Configuration for logging initialization
pub struct LogConfig {
    /// Component name for log identification
    pub component: Component,
    /// Directory for the rolling log file, `None` disables file logging
    pub log_dir: Option<PathBuf>,
    /// Maximum log level
    pub max_level: Level,
    /// Whether to also log to stderr. Stdout is never used: it carries frames.
    pub log_to_console: bool,
    /// Optional custom env filter string
    pub env_filter: Option<String>,
    /// List of dependency crates to silence
    pub silent_deps: Vec<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            component: Component::StoreHost,
            log_dir: None,
            max_level: Level::WARN,
            log_to_console: true,
            env_filter: None,
            silent_deps: Vec::new(),
        }
    }
}

/// Initialize logging for the application
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = Ok(());

    INIT.call_once(|| {
        result = initialize_logging_internal(config);
    });

    result
}

fn initialize_logging_internal(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut layers = Vec::new();

    if config.log_to_console {
        let stderr_layer = fmt::Layer::new()
            .with_ansi(false)
            .with_target(true)
            .with_writer(io::stderr)
            .compact();

        layers.push(stderr_layer.with_filter(build_filter(&config)?).boxed());
    }

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            log_dir,
            format!("{}.log", config.component.as_str()),
        );
        let file_layer = fmt::Layer::new()
            .with_ansi(false)
            .with_writer(file_appender)
            .with_target(true);

        layers.push(file_layer.with_filter(build_filter(&config)?).boxed());
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    Ok(())
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter, Box<dyn std::error::Error>> {
    let mut filter = if let Some(filter_str) = &config.env_filter {
        EnvFilter::try_new(filter_str)?
    } else {
        EnvFilter::try_new(format!("{}", config.max_level))?
            .add_directive(format!("{}={}", config.component.as_str(), config.max_level).parse()?)
    };

    // Apply silencing for noisy dependencies
    for dep in &config.silent_deps {
        filter = filter.add_directive(format!("{}=error", dep).parse()?);
    }

    Ok(filter)
}

/// Maps a `--log-level` style name to a tracing level.
pub fn parse_level(level: &str) -> Option<Level> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_filter_silences_dependencies() {
        let config = LogConfig {
            silent_deps: vec!["mio".into()],
            ..Default::default()
        };
        let filter = build_filter(&config).unwrap().to_string().to_lowercase();
        assert!(filter.contains("mio=error"));
        assert!(filter.contains("store_host=warn"));
    }

    #[test]
    fn test_invalid_env_filter_is_rejected() {
        let config = LogConfig {
            env_filter: Some("store_host=loudest".into()),
            ..Default::default()
        };
        assert!(build_filter(&config).is_err());
    }
}
