//! 核心数据模型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::RulesError;

/// 生命体征指标
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VitalMetric {
    SystolicBp,       // 收缩压
    DiastolicBp,      // 舒张压
    HeartRate,        // 心率
    OxygenSaturation, // 血氧饱和度
    Temperature,      // 体温
    RespiratoryRate,  // 呼吸频率
    BloodGlucose,     // 血糖
}

impl VitalMetric {
    /// 所有支持的指标
    pub const ALL: [VitalMetric; 7] = [
        VitalMetric::SystolicBp,
        VitalMetric::DiastolicBp,
        VitalMetric::HeartRate,
        VitalMetric::OxygenSaturation,
        VitalMetric::Temperature,
        VitalMetric::RespiratoryRate,
        VitalMetric::BloodGlucose,
    ];

    /// 指标键名
    pub fn key(&self) -> &'static str {
        match self {
            VitalMetric::SystolicBp => "systolic_bp",
            VitalMetric::DiastolicBp => "diastolic_bp",
            VitalMetric::HeartRate => "heart_rate",
            VitalMetric::OxygenSaturation => "oxygen_saturation",
            VitalMetric::Temperature => "temperature",
            VitalMetric::RespiratoryRate => "respiratory_rate",
            VitalMetric::BloodGlucose => "blood_glucose",
        }
    }

    /// 显示单位
    pub fn unit(&self) -> &'static str {
        match self {
            VitalMetric::SystolicBp | VitalMetric::DiastolicBp => "mmHg",
            VitalMetric::HeartRate => "bpm",
            VitalMetric::OxygenSaturation => "%",
            VitalMetric::Temperature => "°C",
            VitalMetric::RespiratoryRate => "breaths/min",
            VitalMetric::BloodGlucose => "mg/dL",
        }
    }
}

impl fmt::Display for VitalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for VitalMetric {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        VitalMetric::ALL
            .iter()
            .copied()
            .find(|metric| metric.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| RulesError::InvalidInput(format!("malformed metric key: {:?}", s)))
    }
}

/// 生命体征读数，创建后不可变
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalReading {
    pub id: Uuid,
    pub patient_ref: Uuid,
    pub metric: VitalMetric,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: String,
    pub notes: Option<String>,
}

impl VitalReading {
    /// 创建新的读数
    pub fn new(
        patient_ref: Uuid,
        metric: VitalMetric,
        value: f64,
        recorded_at: DateTime<Utc>,
        recorded_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_ref,
            metric,
            value,
            recorded_at,
            recorded_by: recorded_by.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// 指标参考范围
///
/// 高侧边界为可选项，单侧指标（如血氧饱和度）没有高侧阈值。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalRange {
    pub metric: VitalMetric,
    pub normal_min: f64,
    pub normal_max: Option<f64>,
    pub warning_min: f64,
    pub warning_max: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
}

impl VitalRange {
    /// 校验边界顺序：criticalLow ≤ warningMin ≤ normalMin ≤ normalMax ≤ warningMax ≤ criticalHigh
    pub fn validate(&self) -> Result<(), RulesError> {
        let bounds = [
            ("critical_low", self.critical_low),
            ("warning_min", Some(self.warning_min)),
            ("normal_min", Some(self.normal_min)),
            ("normal_max", self.normal_max),
            ("warning_max", self.warning_max),
            ("critical_high", self.critical_high),
        ];

        let mut previous: Option<(&str, f64)> = None;
        for (name, bound) in bounds {
            let Some(value) = bound else { continue };
            if !value.is_finite() {
                return Err(RulesError::InvalidInput(format!(
                    "{}: {} must be finite",
                    self.metric, name
                )));
            }
            if let Some((prev_name, prev_value)) = previous {
                if value < prev_value {
                    return Err(RulesError::InvalidInput(format!(
                        "{}: {} ({}) is below {} ({})",
                        self.metric, name, value, prev_name, prev_value
                    )));
                }
            }
            previous = Some((name, value));
        }

        // 高侧边界必须由内向外连续给出
        if self.normal_max.is_none() && (self.warning_max.is_some() || self.critical_high.is_some()) {
            return Err(RulesError::InvalidInput(format!(
                "{}: normal_max is unbounded but a high-side warning or critical bound is set",
                self.metric
            )));
        }
        if self.warning_max.is_none() && self.critical_high.is_some() {
            return Err(RulesError::InvalidInput(format!(
                "{}: critical_high is set without warning_max",
                self.metric
            )));
        }

        Ok(())
    }
}

/// 过敏严重程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AllergySeverity {
    Mild,     // 轻度
    Moderate, // 中度
    Severe,   // 重度
}

/// 过敏记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allergy {
    pub allergen: String,
    pub severity: AllergySeverity,
    pub reaction: Option<String>,
}

impl Allergy {
    pub fn new(allergen: impl Into<String>, severity: AllergySeverity) -> Self {
        Self {
            allergen: allergen.into(),
            severity,
            reaction: None,
        }
    }
}

/// 患者信息（规则引擎所需的部分）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub vitals: Vec<VitalReading>,
}

impl Patient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            allergies: Vec::new(),
            vitals: Vec::new(),
        }
    }

    /// 每个指标最近一次的读数
    pub fn latest_vitals(&self) -> Vec<&VitalReading> {
        let mut latest: Vec<&VitalReading> = Vec::new();
        for reading in &self.vitals {
            match latest.iter_mut().find(|r| r.metric == reading.metric) {
                Some(slot) if reading.recorded_at >= slot.recorded_at => *slot = reading,
                Some(_) => {}
                None => latest.push(reading),
            }
        }
        latest
    }
}

/// 给药途径
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MedicationRoute {
    Oral,
    Intravenous,
    Intramuscular,
    Subcutaneous,
    Inhalation,
    Topical,
    Other,
}

/// 给药申请，通过过敏检查后才能生成给药记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationRequest {
    pub medication_name: String,
    pub dosage: f64,
    pub unit: String,
    pub route: MedicationRoute,
    pub notes: Option<String>,
}

/// 给药记录，持久化后不可变
///
/// 只应由 `MedicationGate::administer` 在过敏检查通过后生成，或从持久层读回；不要直接构造。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationAdministration {
    pub id: Uuid,
    pub patient_ref: Uuid,
    pub medication_name: String,
    pub dosage: f64,
    pub unit: String,
    pub route: MedicationRoute,
    pub administered_at: DateTime<Utc>,
    pub administered_by: String,
    pub notes: Option<String>,
}

/// 地点（对规则引擎不透明）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latitude: None,
            longitude: None,
        }
    }
}

/// 转运预约状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Requested, // 已申请
    Confirmed, // 已确认
    EnRoute,   // 前往途中
    PickedUp,  // 已接到患者
    Completed, // 已完成
    Cancelled, // 已取消
}

impl BookingStatus {
    pub fn key(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::EnRoute => "en_route",
            BookingStatus::PickedUp => "picked_up",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BookingStatus {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" => Ok(BookingStatus::Requested),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "en_route" => Ok(BookingStatus::EnRoute),
            "picked_up" => Ok(BookingStatus::PickedUp),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(RulesError::InvalidInput(format!(
                "unknown booking status: {:?}",
                other
            ))),
        }
    }
}

/// 转运预约
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub status: BookingStatus,
    pub pickup_location: Location,
    pub destination_location: Location,
    pub patient_ref: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 乐观锁版本号，每次状态转换递增
    #[serde(default)]
    pub version: u64,
}

impl Booking {
    /// 创建处于 requested 状态的新预约
    pub fn new(patient_ref: Uuid, pickup_location: Location, destination_location: Location) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: BookingStatus::Requested,
            pickup_location,
            destination_location,
            patient_ref,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

/// 时间线事件类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventType {
    StatusChange,   // 状态变更
    Note,           // 备注
    VitalsRecorded, // 记录生命体征
    LocationUpdate, // 位置更新
}

/// 严重程度
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Normal,   // 正常
    Warning,  // 警告
    Critical, // 危急
}

/// 事件发生时捕获的生命体征快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalSnapshot {
    pub metric: VitalMetric,
    pub value: f64,
    pub unit: String,
    pub severity: Severity,
}

/// 时间线事件内容
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelinePayload {
    StatusChange {
        from: BookingStatus,
        to: BookingStatus,
    },
    Note {
        text: String,
    },
    VitalsRecorded {
        snapshot: Vec<VitalSnapshot>,
    },
    LocationUpdate {
        latitude: f64,
        longitude: f64,
    },
}

impl TimelinePayload {
    /// 内容对应的事件类型
    pub fn event_type(&self) -> TimelineEventType {
        match self {
            TimelinePayload::StatusChange { .. } => TimelineEventType::StatusChange,
            TimelinePayload::Note { .. } => TimelineEventType::Note,
            TimelinePayload::VitalsRecorded { .. } => TimelineEventType::VitalsRecorded,
            TimelinePayload::LocationUpdate { .. } => TimelineEventType::LocationUpdate,
        }
    }
}

/// 时间线事件，只追加，创建后不可修改
///
/// 反序列化时校验 `type` 与内容标签一致。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "StoredTimelineEvent")]
pub struct TimelineEvent {
    pub id: Uuid,
    pub booking_ref: Uuid,
    #[serde(rename = "type")]
    pub event_type: TimelineEventType,
    pub timestamp: DateTime<Utc>,
    pub author_ref: String,
    pub payload: TimelinePayload,
}

impl TimelineEvent {
    /// 创建事件，类型由内容推导
    pub fn new(
        booking_ref: Uuid,
        timestamp: DateTime<Utc>,
        author_ref: impl Into<String>,
        payload: TimelinePayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_ref,
            event_type: payload.event_type(),
            timestamp,
            author_ref: author_ref.into(),
            payload,
        }
    }
}

/// 存储中的时间线事件，未经一致性校验
#[derive(Deserialize)]
struct StoredTimelineEvent {
    id: Uuid,
    booking_ref: Uuid,
    #[serde(rename = "type")]
    event_type: TimelineEventType,
    timestamp: DateTime<Utc>,
    author_ref: String,
    payload: TimelinePayload,
}

impl TryFrom<StoredTimelineEvent> for TimelineEvent {
    type Error = RulesError;

    fn try_from(stored: StoredTimelineEvent) -> Result<Self, Self::Error> {
        let payload_type = stored.payload.event_type();
        if stored.event_type != payload_type {
            return Err(RulesError::InvalidInput(format!(
                "event {}: type {:?} does not match payload {:?}",
                stored.id, stored.event_type, payload_type
            )));
        }

        Ok(Self {
            id: stored.id,
            booking_ref: stored.booking_ref,
            event_type: stored.event_type,
            timestamp: stored.timestamp,
            author_ref: stored.author_ref,
            payload: stored.payload,
        })
    }
}

/// 预约备注
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingNote {
    pub id: Uuid,
    pub booking_ref: Uuid,
    pub author_ref: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// 车辆位置上报
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPing {
    pub booking_ref: Uuid,
    pub reported_by: String,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}
