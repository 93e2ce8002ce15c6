//! 配置管理
//!
//! 从可选的 TOML 文件和 `MEDTRANS__*` 环境变量加载规则引擎配置，支持校验、更新和重新加载。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use medtrans_core::{VitalMetric, VitalRange};
use medtrans_rules::VitalRangeTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::logging::LogLevel;

/// 规则引擎配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// 覆盖内置默认值的参考范围
    pub vital_ranges: Vec<VitalRange>,
    /// 日志配置
    pub logging: LoggingConfig,
}

impl RulesConfig {
    /// 内置默认范围叠加覆盖项后的范围表
    pub fn range_table(&self) -> Result<VitalRangeTable> {
        let mut table = VitalRangeTable::standard();
        for range in &self.vital_ranges {
            table
                .insert(range.clone())
                .with_context(|| format!("Invalid vital range override for {}", range.metric))?;
        }
        Ok(table)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 输出 JSON 格式
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: Arc<RwLock<RulesConfig>>,
    /// 配置文件路径
    config_path: Option<String>,
    /// 配置验证器
    validator: ConfigValidator,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_path: Option<&str>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(str::to_string),
            validator,
        })
    }

    /// 从文件和环境变量加载配置
    fn load_config(config_path: Option<&str>) -> Result<RulesConfig> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix("MEDTRANS").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: RulesConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded successfully from: {}", path),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub async fn get_config(&self) -> RulesConfig {
        let config = self.config.read().await;
        config.clone()
    }

    /// 当前配置对应的范围表
    pub async fn range_table(&self) -> Result<VitalRangeTable> {
        let config = self.config.read().await;
        config.range_table()
    }

    /// 更新配置
    pub async fn update_config(&self, new_config: RulesConfig) -> Result<()> {
        // 验证新配置
        self.validator.validate(&new_config)?;

        {
            let mut config = self.config.write().await;
            *config = new_config;
        }

        if self.config_path.is_some() {
            self.save_config().await?;
        }

        info!("Configuration updated successfully");
        Ok(())
    }

    /// 保存配置到文件
    pub async fn save_config(&self) -> Result<()> {
        let path = self
            .config_path
            .as_deref()
            .context("No configuration file path set")?;

        let config = self.config.read().await;
        let config_str = toml::to_string_pretty(&*config).context("Failed to serialize configuration")?;

        tokio::fs::write(path, config_str)
            .await
            .context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path);
        Ok(())
    }

    /// 重新加载配置
    pub async fn reload_config(&self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.validator.validate(&new_config)?;

        let mut config = self.config.write().await;
        *config = new_config;

        info!("Configuration reloaded");
        Ok(())
    }

    /// 获取配置值，路径以点分隔，如 `logging.level`
    pub async fn get_value<T>(&self, path: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let config = self.config.read().await;
        let value = extract_nested_value(&config, path)
            .with_context(|| format!("Configuration path not found: {}", path))?;

        serde_json::from_value(value).context("Failed to deserialize configuration value")
    }

    /// 验证配置
    pub async fn validate_config(&self) -> Result<()> {
        let config = self.config.read().await;
        self.validator.validate(&config)
    }
}

/// 提取嵌套值
fn extract_nested_value(config: &RulesConfig, path: &str) -> Result<serde_json::Value> {
    let config_json = serde_json::to_value(config).context("Failed to serialize config to JSON")?;

    let mut current = &config_json;
    for part in path.split('.') {
        match current {
            serde_json::Value::Object(map) => {
                current = map
                    .get(part)
                    .ok_or_else(|| anyhow::anyhow!("Path segment not found: {}", part))?;
            }
            _ => return Err(anyhow::anyhow!("Invalid path at segment: {}", part)),
        }
    }

    Ok(current.clone())
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    field_path: String,
    validator: fn(&RulesConfig) -> Result<()>,
    error_message: String,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "vital_ranges".to_string(),
                validator: |config| {
                    for range in &config.vital_ranges {
                        range.validate()?;
                    }
                    Ok(())
                },
                error_message: "Invalid vital range".to_string(),
            },
            ValidationRule {
                field_path: "vital_ranges".to_string(),
                validator: |config| {
                    let mut seen: HashSet<VitalMetric> = HashSet::new();
                    for range in &config.vital_ranges {
                        if !seen.insert(range.metric) {
                            return Err(anyhow::anyhow!("Duplicate override for {}", range.metric));
                        }
                    }
                    Ok(())
                },
                error_message: "Duplicate vital range".to_string(),
            },
            ValidationRule {
                field_path: "logging.level".to_string(),
                validator: |config| {
                    config.logging.level.parse::<LogLevel>()?;
                    Ok(())
                },
                error_message: "Invalid log level".to_string(),
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &RulesConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
