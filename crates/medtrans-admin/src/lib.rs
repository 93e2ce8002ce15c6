//! # medtrans 管理模块
//!
//! 提供规则引擎的配置管理和日志初始化

pub mod config;
pub mod logging;

pub use config::{ConfigManager, ConfigValidator, LoggingConfig, RulesConfig};
pub use logging::{init_logging, LogLevel};
