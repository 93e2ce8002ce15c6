//! # medtrans 规则引擎
//!
//! 医疗转运应用中承担决策逻辑的部分，包括：
//! - 生命体征分级：按参考范围表判定正常/警告/危急，用于显示标记和告警
//! - 过敏冲突检测：给药前比对药名与患者过敏清单
//! - 预约状态机：管理转运预约生命周期并记录状态变更事件
//! - 时间线组装：将多种来源的事件合并为有序的显示序列

pub mod allergy;
pub mod engine;
pub mod state_machine;
pub mod timeline;
pub mod vital_range;
pub mod vitals;

// 重新导出主要类型
pub use allergy::{match_allergy, Checkpoint, GateOutcome, MedicationGate};
pub use engine::{PatientOverview, RuleEngine};
pub use state_machine::{BookingStateMachine, TransitionOutcome};
pub use timeline::{assemble, display_key, Assembled, DisplayKey, RenderableEvent, TimelineSources};
pub use vital_range::VitalRangeTable;
pub use vitals::{
    BloodPressureAssessment, VitalAlert, VitalClassification, VitalClassifier, VitalFlag, VitalsAssessment,
};
