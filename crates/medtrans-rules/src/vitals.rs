//! 生命体征分类
//!
//! 按参考范围表对读数分级（正常/警告/危急），并为警告与危急读数生成告警。
//! 分类是纯函数：同样的指标、数值和范围表总是得到同样的结果。

use chrono::{DateTime, Utc};
use medtrans_core::{Result, RulesError, Severity, VitalMetric, VitalRange, VitalReading, VitalSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vital_range::VitalRangeTable;

/// 分类标记
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VitalFlag {
    BelowNormal,    // 低于正常
    AboveNormal,    // 高于正常
    CriticalLow,    // 危急低值
    CriticalHigh,   // 危急高值
    NoRangeDefined, // 无参考范围
}

/// 单个读数的分类结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalClassification {
    pub metric: VitalMetric,
    pub value: Option<f64>,
    pub severity: Severity,
    pub flags: Vec<VitalFlag>,
}

/// 血压组合评估，取收缩压与舒张压中更严重的一项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BloodPressureAssessment {
    pub systolic: VitalClassification,
    pub diastolic: VitalClassification,
    pub severity: Severity,
}

/// 生命体征告警
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalAlert {
    pub id: Uuid,
    pub reading_id: Uuid,
    pub patient_ref: Uuid,
    pub metric: VitalMetric,
    pub value: f64,
    pub severity: Severity,
    pub recorded_at: DateTime<Utc>,
    pub message: String,
}

/// 一批读数的评估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsAssessment {
    pub classifications: Vec<VitalClassification>,
    pub blood_pressure: Option<BloodPressureAssessment>,
    pub worst: Severity,
    pub alerts: Vec<VitalAlert>,
}

/// 生命体征分类器
#[derive(Debug, Clone)]
pub struct VitalClassifier {
    table: VitalRangeTable,
}

impl VitalClassifier {
    /// 使用指定范围表创建分类器
    pub fn new(table: VitalRangeTable) -> Self {
        Self { table }
    }

    /// 使用内置默认范围创建分类器
    pub fn standard() -> Self {
        Self::new(VitalRangeTable::standard())
    }

    pub fn table(&self) -> &VitalRangeTable {
        &self.table
    }

    /// 对数值分级；缺失的数值视为正常
    pub fn classify(&self, metric: VitalMetric, value: Option<f64>) -> Result<Severity> {
        Ok(self.classify_reading(metric, value)?.severity)
    }

    /// 对数值分级并给出标记
    pub fn classify_reading(&self, metric: VitalMetric, value: Option<f64>) -> Result<VitalClassification> {
        let Some(value) = value else {
            return Ok(VitalClassification {
                metric,
                value: None,
                severity: Severity::Normal,
                flags: Vec::new(),
            });
        };

        if !value.is_finite() {
            return Err(RulesError::InvalidInput(format!(
                "{} value must be a finite number",
                metric
            )));
        }

        let (severity, flags) = match self.table.get(metric) {
            Some(range) => evaluate(range, value),
            None => {
                // 范围表尚未覆盖的指标不阻断记录
                tracing::debug!("No vital range defined for {}, treating as normal", metric);
                (Severity::Normal, vec![VitalFlag::NoRangeDefined])
            }
        };

        Ok(VitalClassification {
            metric,
            value: Some(value),
            severity,
            flags,
        })
    }

    /// 血压组合分级
    pub fn classify_blood_pressure(
        &self,
        systolic: Option<f64>,
        diastolic: Option<f64>,
    ) -> Result<BloodPressureAssessment> {
        let systolic = self.classify_reading(VitalMetric::SystolicBp, systolic)?;
        let diastolic = self.classify_reading(VitalMetric::DiastolicBp, diastolic)?;
        let severity = systolic.severity.max(diastolic.severity);

        Ok(BloodPressureAssessment {
            systolic,
            diastolic,
            severity,
        })
    }

    /// 生成读数快照
    pub fn snapshot(&self, reading: &VitalReading) -> Result<VitalSnapshot> {
        Ok(VitalSnapshot {
            metric: reading.metric,
            value: reading.value,
            unit: reading.metric.unit().to_string(),
            severity: self.classify(reading.metric, Some(reading.value))?,
        })
    }

    /// 评估一批读数（通常是一次记录），为警告和危急读数生成告警
    pub fn assess_readings(&self, readings: &[VitalReading]) -> Result<VitalsAssessment> {
        let mut classifications = Vec::with_capacity(readings.len());
        let mut alerts = Vec::new();
        let mut systolic = None;
        let mut diastolic = None;

        for reading in readings {
            let classification = self.classify_reading(reading.metric, Some(reading.value))?;

            match reading.metric {
                VitalMetric::SystolicBp => systolic = Some(reading.value),
                VitalMetric::DiastolicBp => diastolic = Some(reading.value),
                _ => {}
            }

            if classification.severity > Severity::Normal {
                alerts.push(build_alert(reading, classification.severity));
            }
            classifications.push(classification);
        }

        let blood_pressure = if systolic.is_some() || diastolic.is_some() {
            Some(self.classify_blood_pressure(systolic, diastolic)?)
        } else {
            None
        };

        let worst = classifications
            .iter()
            .map(|c| c.severity)
            .max()
            .unwrap_or(Severity::Normal);

        Ok(VitalsAssessment {
            classifications,
            blood_pressure,
            worst,
            alerts,
        })
    }
}

impl Default for VitalClassifier {
    fn default() -> Self {
        Self::standard()
    }
}

/// 按范围判定等级
///
/// 低侧危急阈值为严格小于，高侧危急阈值包含等于；正常区间两端均包含。
fn evaluate(range: &VitalRange, value: f64) -> (Severity, Vec<VitalFlag>) {
    let mut flags = Vec::new();

    let below_normal = value < range.normal_min;
    let above_normal = range.normal_max.is_some_and(|max| value > max);
    if below_normal {
        flags.push(VitalFlag::BelowNormal);
    }
    if above_normal {
        flags.push(VitalFlag::AboveNormal);
    }

    let critical_low = range.critical_low.is_some_and(|low| value < low) || value < range.warning_min;
    let critical_high = range.critical_high.is_some_and(|high| value >= high)
        || range.warning_max.is_some_and(|max| value > max);

    if critical_low {
        flags.push(VitalFlag::CriticalLow);
        return (Severity::Critical, flags);
    }
    if critical_high {
        flags.push(VitalFlag::CriticalHigh);
        return (Severity::Critical, flags);
    }

    if below_normal || above_normal {
        (Severity::Warning, flags)
    } else {
        (Severity::Normal, flags)
    }
}

fn build_alert(reading: &VitalReading, severity: Severity) -> VitalAlert {
    let message = format!(
        "{} {} {} is {:?}",
        reading.metric,
        reading.value,
        reading.metric.unit(),
        severity
    );

    match severity {
        Severity::Critical => tracing::error!(
            "Critical vital for patient {}: {}",
            reading.patient_ref,
            message
        ),
        _ => tracing::warn!("Vital warning for patient {}: {}", reading.patient_ref, message),
    }

    VitalAlert {
        id: Uuid::new_v4(),
        reading_id: reading.id,
        patient_ref: reading.patient_ref,
        metric: reading.metric,
        value: reading.value,
        severity,
        recorded_at: reading.recorded_at,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(metric: VitalMetric, value: f64) -> Severity {
        VitalClassifier::standard().classify(metric, Some(value)).unwrap()
    }

    #[test]
    fn test_normal_max_boundary_is_normal() {
        let classifier = VitalClassifier::standard();
        for metric in VitalMetric::ALL {
            let range = classifier.table().get(metric).unwrap().clone();
            let Some(normal_max) = range.normal_max else { continue };

            assert_eq!(classify(metric, normal_max), Severity::Normal, "{} at normal_max", metric);
            assert_eq!(classify(metric, normal_max + 1.0), Severity::Warning, "{} above normal_max", metric);
            if let Some(high) = range.critical_high {
                assert_eq!(classify(metric, high), Severity::Critical, "{} at critical_high", metric);
            }
        }
    }

    #[test]
    fn test_normal_min_boundary_is_normal() {
        assert_eq!(classify(VitalMetric::HeartRate, 60.0), Severity::Normal);
        assert_eq!(classify(VitalMetric::HeartRate, 59.0), Severity::Warning);
        assert_eq!(classify(VitalMetric::HeartRate, 40.0), Severity::Warning);
        assert_eq!(classify(VitalMetric::HeartRate, 39.0), Severity::Critical);
    }

    #[test]
    fn test_oxygen_saturation_thresholds() {
        assert_eq!(classify(VitalMetric::OxygenSaturation, 89.0), Severity::Critical);
        assert_eq!(classify(VitalMetric::OxygenSaturation, 89.9), Severity::Critical);
        assert_eq!(classify(VitalMetric::OxygenSaturation, 90.0), Severity::Warning);
        assert_eq!(classify(VitalMetric::OxygenSaturation, 94.0), Severity::Warning);
        assert_eq!(classify(VitalMetric::OxygenSaturation, 95.0), Severity::Normal);
        assert_eq!(classify(VitalMetric::OxygenSaturation, 100.0), Severity::Normal);
        // 无高侧警告
        assert_eq!(classify(VitalMetric::OxygenSaturation, 101.0), Severity::Normal);
    }

    #[test]
    fn test_missing_value_is_normal() {
        let classifier = VitalClassifier::standard();
        let result = classifier.classify_reading(VitalMetric::Temperature, None).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert!(result.flags.is_empty());
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let classifier = VitalClassifier::standard();
        assert!(matches!(
            classifier.classify(VitalMetric::HeartRate, Some(f64::NAN)),
            Err(RulesError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_metric_treated_as_normal() {
        let mut table = VitalRangeTable::standard();
        table.remove(VitalMetric::BloodGlucose);
        let classifier = VitalClassifier::new(table);

        let result = classifier.classify_reading(VitalMetric::BloodGlucose, Some(900.0)).unwrap();
        assert_eq!(result.severity, Severity::Normal);
        assert_eq!(result.flags, vec![VitalFlag::NoRangeDefined]);
    }

    #[test]
    fn test_flags() {
        let classifier = VitalClassifier::standard();

        let low = classifier.classify_reading(VitalMetric::Temperature, Some(34.0)).unwrap();
        assert_eq!(low.flags, vec![VitalFlag::BelowNormal, VitalFlag::CriticalLow]);

        let high = classifier.classify_reading(VitalMetric::RespiratoryRate, Some(24.0)).unwrap();
        assert_eq!(high.severity, Severity::Warning);
        assert_eq!(high.flags, vec![VitalFlag::AboveNormal]);
    }

    #[test]
    fn test_gap_beyond_warning_band_is_critical() {
        let table = VitalRangeTable::from_ranges(vec![VitalRange {
            metric: VitalMetric::HeartRate,
            normal_min: 60.0,
            normal_max: Some(100.0),
            warning_min: 50.0,
            warning_max: Some(120.0),
            critical_low: Some(40.0),
            critical_high: Some(150.0),
        }])
        .unwrap();
        let classifier = VitalClassifier::new(table);

        assert_eq!(classifier.classify(VitalMetric::HeartRate, Some(130.0)).unwrap(), Severity::Critical);
        assert_eq!(classifier.classify(VitalMetric::HeartRate, Some(45.0)).unwrap(), Severity::Critical);
        assert_eq!(classifier.classify(VitalMetric::HeartRate, Some(120.0)).unwrap(), Severity::Warning);
    }

    #[test]
    fn test_blood_pressure_bundle_takes_worst() {
        let classifier = VitalClassifier::standard();

        let bp = classifier.classify_blood_pressure(Some(118.0), Some(95.0)).unwrap();
        assert_eq!(bp.systolic.severity, Severity::Normal);
        assert_eq!(bp.diastolic.severity, Severity::Warning);
        assert_eq!(bp.severity, Severity::Warning);

        let bp = classifier.classify_blood_pressure(Some(185.0), Some(70.0)).unwrap();
        assert_eq!(bp.severity, Severity::Critical);

        let bp = classifier.classify_blood_pressure(None, Some(70.0)).unwrap();
        assert_eq!(bp.severity, Severity::Normal);
    }

    #[test]
    fn test_assess_readings_builds_alerts() {
        let classifier = VitalClassifier::standard();
        let patient = Uuid::new_v4();
        let now = Utc::now();
        let readings = vec![
            VitalReading::new(patient, VitalMetric::HeartRate, 72.0, now, "nurse-1"),
            VitalReading::new(patient, VitalMetric::OxygenSaturation, 88.0, now, "nurse-1"),
            VitalReading::new(patient, VitalMetric::SystolicBp, 135.0, now, "nurse-1"),
            VitalReading::new(patient, VitalMetric::DiastolicBp, 78.0, now, "nurse-1"),
        ];

        let assessment = classifier.assess_readings(&readings).unwrap();
        assert_eq!(assessment.classifications.len(), 4);
        assert_eq!(assessment.worst, Severity::Critical);
        assert_eq!(assessment.alerts.len(), 2);
        assert_eq!(assessment.alerts[0].metric, VitalMetric::OxygenSaturation);
        assert_eq!(assessment.alerts[0].severity, Severity::Critical);
        assert_eq!(assessment.blood_pressure.unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_snapshot_copies_value() {
        let classifier = VitalClassifier::standard();
        let reading = VitalReading::new(Uuid::new_v4(), VitalMetric::Temperature, 38.4, Utc::now(), "medic");
        let snapshot = classifier.snapshot(&reading).unwrap();
        assert_eq!(snapshot.value, 38.4);
        assert_eq!(snapshot.unit, "°C");
        assert_eq!(snapshot.severity, Severity::Warning);
    }
}
