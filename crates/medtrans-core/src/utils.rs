//! 边界解析工具
//!
//! 表单输入以字符串形式到达，在进入分类器之前先在此解析和校验。

use crate::error::{Result, RulesError};
use crate::models::VitalMetric;

/// 解析生命体征数值
///
/// 空白输入表示未测量，返回 `None`；非数字或非有限值返回 `InvalidInput`。
pub fn parse_vital_value(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| RulesError::InvalidInput(format!("non-numeric vital value: {:?}", raw)))?;

    if !value.is_finite() {
        return Err(RulesError::InvalidInput(format!(
            "vital value must be finite: {:?}",
            raw
        )));
    }

    Ok(Some(value))
}

/// 解析指标键名
pub fn parse_metric_key(raw: &str) -> Result<VitalMetric> {
    raw.parse()
}

/// 统一小写并去除首尾空白，用于名称比较
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
