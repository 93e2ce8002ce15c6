//! 错误定义模块

use thiserror::Error;

use crate::models::AllergySeverity;

/// 规则引擎统一错误类型
///
/// 所有错误都以结构化结果返回给调用方，由调用方决定阻断操作还是仅做标注。
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("无效状态转换: 从 {from} 到 {to}")]
    InvalidTransition { from: String, to: String },

    #[error("过敏冲突: 药物 {medication} 与过敏原 {allergen} ({severity:?}) 匹配")]
    AllergyConflict {
        allergen: String,
        severity: AllergySeverity,
        medication: String,
    },

    #[error("未知指标: {0}")]
    UnknownMetric(String),
}

impl RulesError {
    /// 该错误是否应阻断调用方的操作（否则仅做字段标注）
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            RulesError::InvalidTransition { .. } | RulesError::AllergyConflict { .. }
        )
    }
}

/// 规则引擎统一结果类型
pub type Result<T> = std::result::Result<T, RulesError>;
