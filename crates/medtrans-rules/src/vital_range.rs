//! 生命体征参考范围表
//!
//! 每个指标的正常/警告/危急区间定义，进程内只读配置。

use medtrans_core::{Result, RulesError, VitalMetric, VitalRange};
use std::collections::HashMap;

/// 参考范围表
#[derive(Debug, Clone)]
pub struct VitalRangeTable {
    ranges: HashMap<VitalMetric, VitalRange>,
}

impl VitalRangeTable {
    /// 创建空表
    pub fn empty() -> Self {
        Self {
            ranges: HashMap::new(),
        }
    }

    /// 内置的成人默认范围
    pub fn standard() -> Self {
        let ranges = vec![
            two_sided(VitalMetric::SystolicBp, (90.0, 120.0), (80.0, 180.0)),
            two_sided(VitalMetric::DiastolicBp, (60.0, 80.0), (50.0, 120.0)),
            two_sided(VitalMetric::HeartRate, (60.0, 100.0), (40.0, 130.0)),
            // 血氧只有低侧阈值
            VitalRange {
                metric: VitalMetric::OxygenSaturation,
                normal_min: 95.0,
                normal_max: None,
                warning_min: 90.0,
                warning_max: None,
                critical_low: Some(90.0),
                critical_high: None,
            },
            two_sided(VitalMetric::Temperature, (36.1, 37.2), (35.0, 39.5)),
            two_sided(VitalMetric::RespiratoryRate, (12.0, 20.0), (8.0, 30.0)),
            two_sided(VitalMetric::BloodGlucose, (70.0, 140.0), (54.0, 250.0)),
        ];

        Self {
            ranges: ranges.into_iter().map(|r| (r.metric, r)).collect(),
        }
    }

    /// 由范围列表构建，逐一校验
    pub fn from_ranges(ranges: impl IntoIterator<Item = VitalRange>) -> Result<Self> {
        let mut table = Self::empty();
        for range in ranges {
            table.insert(range)?;
        }
        Ok(table)
    }

    /// 插入或覆盖某指标的范围
    pub fn insert(&mut self, range: VitalRange) -> Result<()> {
        range.validate()?;
        tracing::debug!("Vital range registered for {}", range.metric);
        self.ranges.insert(range.metric, range);
        Ok(())
    }

    /// 移除某指标的范围
    pub fn remove(&mut self, metric: VitalMetric) -> Option<VitalRange> {
        self.ranges.remove(&metric)
    }

    /// 查询某指标的范围
    pub fn get(&self, metric: VitalMetric) -> Option<&VitalRange> {
        self.ranges.get(&metric)
    }

    /// 查询某指标的范围，未定义时返回 `UnknownMetric`
    pub fn require(&self, metric: VitalMetric) -> Result<&VitalRange> {
        self.get(metric)
            .ok_or_else(|| RulesError::UnknownMetric(metric.to_string()))
    }

    /// 已定义范围的指标，按固定顺序返回
    pub fn metrics(&self) -> Vec<VitalMetric> {
        let mut metrics: Vec<VitalMetric> = self.ranges.keys().copied().collect();
        metrics.sort();
        metrics
    }

    /// 按指标顺序返回所有范围
    pub fn ranges(&self) -> Vec<&VitalRange> {
        self.metrics()
            .into_iter()
            .filter_map(|metric| self.ranges.get(&metric))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl Default for VitalRangeTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// 双侧指标：警告区间边界同时作为危急阈值
fn two_sided(metric: VitalMetric, normal: (f64, f64), warning: (f64, f64)) -> VitalRange {
    VitalRange {
        metric,
        normal_min: normal.0,
        normal_max: Some(normal.1),
        warning_min: warning.0,
        warning_max: Some(warning.1),
        critical_low: Some(warning.0),
        critical_high: Some(warning.1),
    }
}
