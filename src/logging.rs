use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Target of per-request access lines
pub const ACCESS_LOG_TARGET: &str = "ACCESS";

/// Filter directives: the configured level, access lines muted unless enabled.
pub fn filter_directives(config: &AppConfig) -> String {
    if config.enable_access_log {
        config.log_level.clone()
    } else {
        format!("{},{}=off", config.log_level, ACCESS_LOG_TARGET)
    }
}

pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enable_access_log: bool) -> AppConfig {
        let mut config = AppConfig::from_yaml(
            r#"
log_level: debug
log_dir: ./logs
log_file: gateway.log
use_json: true
rotation: never
gateway: { host: 0.0.0.0, port: 8080 }
backend: { url: "http://localhost:54321" }
"#,
        )
        .unwrap();
        config.enable_access_log = enable_access_log;
        config
    }

    #[test]
    fn test_access_log_toggle() {
        assert_eq!(filter_directives(&config(true)), "debug");
        assert_eq!(filter_directives(&config(false)), "debug,ACCESS=off");
    }
}
