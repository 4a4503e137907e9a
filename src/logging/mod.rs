use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志级别过滤的环境变量
pub const LOG_ENV: &str = "SVC_FACTORY_LOG";

/// 日志环境配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingEnvironment {
    /// 开发环境
    Development,
    /// 测试环境
    Testing,
    /// 生产环境
    Production,
}

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// JSON 格式
    Json,
    /// 紧凑格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub environment: LoggingEnvironment,
    /// 未设置 `SVC_FACTORY_LOG` 时使用的级别
    pub level: Level,
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: Level::INFO,
            format: LogFormat::Compact,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: true,
        }
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        Self {
            environment: LoggingEnvironment::Production,
            level: Level::INFO,
            format: LogFormat::Json,
            show_target: false,
            show_thread_ids: false,
        }
    }

    /// 创建测试环境配置
    pub fn testing() -> Self {
        Self {
            environment: LoggingEnvironment::Testing,
            level: Level::ERROR,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
        }
    }

    /// 按级别名称覆盖默认级别，无法识别时保持原值
    pub fn with_level_name(mut self, level: &str) -> Self {
        match level.trim().parse::<Level>() {
            Ok(level) => self.level = level,
            Err(_) => eprintln!("ignoring unknown log level '{level}'"),
        }
        self
    }

    /// 环境变量优先，其次为配置的级别
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_ascii_lowercase()))
    }
}

/// 初始化日志系统；`log` 记录经由 tracing-subscriber 桥接
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.env_filter();
    let ansi = config.environment != LoggingEnvironment::Production;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.show_target)
                    .with_thread_ids(config.show_thread_ids)
                    .with_ansi(ansi)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    tracing::debug!(
        environment = ?config.environment,
        level = %config.level,
        format = ?config.format,
        "logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        let dev_config = LoggingConfig::development();
        assert_eq!(dev_config.environment, LoggingEnvironment::Development);
        assert_eq!(dev_config.level, Level::DEBUG);
        assert_eq!(dev_config.format, LogFormat::Pretty);

        let prod_config = LoggingConfig::production();
        assert_eq!(prod_config.level, Level::INFO);
        assert_eq!(prod_config.format, LogFormat::Json);

        let test_config = LoggingConfig::testing();
        assert_eq!(test_config.level, Level::ERROR);
        assert_eq!(test_config.format, LogFormat::Compact);
    }

    #[test]
    fn level_names_override() {
        assert_eq!(LoggingConfig::default().with_level_name("debug").level, Level::DEBUG);
        assert_eq!(LoggingConfig::default().with_level_name("WARN").level, Level::WARN);
        assert_eq!(LoggingConfig::default().with_level_name("chatty").level, Level::INFO);
    }
}
