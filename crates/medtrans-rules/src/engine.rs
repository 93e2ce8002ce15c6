//! 规则引擎
//!
//! 协调生命体征分类、过敏检查、预约状态机和时间线组装的统一入口。
//! 调用方（I/O 层）负责读取记录、调用引擎并持久化结果。

use medtrans_core::{
    Booking, BookingStatus, MedicationAdministration, MedicationRequest, Patient, Result, Severity,
    TimelineEvent, VitalReading,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    allergy::{Checkpoint, GateOutcome, MedicationGate},
    state_machine::{BookingStateMachine, TransitionOutcome},
    timeline::{assemble, RenderableEvent, TimelineSources},
    vital_range::VitalRangeTable,
    vitals::{VitalClassifier, VitalsAssessment},
};

/// 规则引擎
#[derive(Debug)]
pub struct RuleEngine {
    classifier: VitalClassifier,
    gate: MedicationGate,
    state_machine: BookingStateMachine,
}

impl RuleEngine {
    /// 使用内置默认范围创建规则引擎
    pub fn new() -> Self {
        Self::with_ranges(VitalRangeTable::standard())
    }

    /// 使用指定范围表创建规则引擎
    pub fn with_ranges(table: VitalRangeTable) -> Self {
        Self {
            classifier: VitalClassifier::new(table),
            gate: MedicationGate::new(),
            state_machine: BookingStateMachine::new(),
        }
    }

    /// 评估新记录的生命体征
    ///
    /// 读数必须属于该患者，否则返回 `InvalidInput`。
    pub fn record_vitals(&self, patient: &Patient, readings: &[VitalReading]) -> Result<VitalsAssessment> {
        if let Some(foreign) = readings.iter().find(|r| r.patient_ref != patient.id) {
            return Err(medtrans_core::RulesError::InvalidInput(format!(
                "reading {} belongs to patient {}, not {}",
                foreign.id, foreign.patient_ref, patient.id
            )));
        }

        tracing::info!("Assessing {} vital readings for patient {}", readings.len(), patient.id);
        self.classifier.assess_readings(readings)
    }

    /// 在指定检查点检查药名
    pub fn check_medication(&self, patient: &Patient, medication_name: &str, checkpoint: Checkpoint) -> GateOutcome {
        self.gate.check(&patient.allergies, medication_name, checkpoint)
    }

    /// 给药
    pub fn administer_medication(
        &self,
        patient: &Patient,
        request: &MedicationRequest,
        actor: &str,
    ) -> Result<MedicationAdministration> {
        self.gate.administer(patient, request, actor)
    }

    /// 推进预约状态
    pub fn advance_booking(&self, booking: &Booking, target: BookingStatus, actor: &str) -> Result<TransitionOutcome> {
        self.state_machine.apply_transition(booking, target, actor)
    }

    /// 预约当前允许的目标状态
    pub fn permitted_transitions(&self, booking: &Booking) -> Vec<BookingStatus> {
        self.state_machine.permitted_transitions(booking.status)
    }

    /// 组装时间线
    pub fn timeline(&self, events: &[TimelineEvent]) -> Vec<RenderableEvent> {
        assemble(events).collect()
    }

    /// 合并原始来源后组装时间线
    pub fn timeline_from_sources(&self, sources: &TimelineSources) -> Result<Vec<RenderableEvent>> {
        let merged = sources.merge(&self.classifier)?;
        Ok(self.timeline(&merged))
    }

    /// 患者与预约概览
    pub fn overview(&self, patient: &Patient, booking: &Booking) -> Result<PatientOverview> {
        let mut worst_vital = Severity::Normal;
        for reading in patient.latest_vitals() {
            let severity = self.classifier.classify(reading.metric, Some(reading.value))?;
            worst_vital = worst_vital.max(severity);
        }

        Ok(PatientOverview {
            patient_id: patient.id,
            booking_id: booking.id,
            worst_vital,
            allergy_count: patient.allergies.len(),
            booking_status: booking.status,
            permitted_transitions: self.permitted_transitions(booking),
        })
    }

    /// 获取分类器实例
    pub fn classifier(&self) -> &VitalClassifier {
        &self.classifier
    }

    /// 获取状态机实例
    pub fn state_machine(&self) -> &BookingStateMachine {
        &self.state_machine
    }

    /// 获取给药闸门实例
    pub fn gate(&self) -> &MedicationGate {
        &self.gate
    }
}

/// 患者与预约概览
#[derive(Debug, Clone, Serialize)]
pub struct PatientOverview {
    pub patient_id: Uuid,
    pub booking_id: Uuid,
    pub worst_vital: Severity,
    pub allergy_count: usize,
    pub booking_status: BookingStatus,
    pub permitted_transitions: Vec<BookingStatus>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use medtrans_core::{Allergy, AllergySeverity, Location, MedicationRoute, RulesError, VitalMetric};

    fn patient_with_booking() -> (Patient, Booking) {
        let mut patient = Patient::new("Test Patient");
        patient.allergies.push(Allergy::new("latex", AllergySeverity::Severe));
        let booking = Booking::new(patient.id, Location::new("Home"), Location::new("Clinic"));
        (patient, booking)
    }

    #[test]
    fn test_record_vitals_rejects_foreign_readings() {
        let engine = RuleEngine::new();
        let (patient, _) = patient_with_booking();
        let readings = vec![VitalReading::new(Uuid::new_v4(), VitalMetric::HeartRate, 80.0, Utc::now(), "nurse")];

        assert!(matches!(
            engine.record_vitals(&patient, &readings),
            Err(RulesError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_medication_flow() {
        let engine = RuleEngine::new();
        let (patient, _) = patient_with_booking();

        let outcome = engine.check_medication(&patient, "Latex-free glove adhesive", Checkpoint::Keystroke);
        assert!(matches!(outcome, GateOutcome::Warn { .. }));

        let request = MedicationRequest {
            medication_name: "Latex-free glove adhesive".to_string(),
            dosage: 1.0,
            unit: "application".to_string(),
            route: MedicationRoute::Topical,
            notes: None,
        };
        assert!(matches!(
            engine.administer_medication(&patient, &request, "nurse"),
            Err(RulesError::AllergyConflict { .. })
        ));
    }

    #[test]
    fn test_overview() {
        let engine = RuleEngine::new();
        let (mut patient, booking) = patient_with_booking();
        let t0 = Utc::now();
        patient.vitals.push(VitalReading::new(patient.id, VitalMetric::OxygenSaturation, 85.0, t0, "medic"));
        patient.vitals.push(VitalReading::new(
            patient.id,
            VitalMetric::OxygenSaturation,
            93.0,
            t0 + Duration::minutes(5),
            "medic",
        ));

        let overview = engine.overview(&patient, &booking).unwrap();
        // 只看最近一次读数
        assert_eq!(overview.worst_vital, Severity::Warning);
        assert_eq!(overview.allergy_count, 1);
        assert_eq!(overview.booking_status, BookingStatus::Requested);
        assert_eq!(
            overview.permitted_transitions,
            vec![BookingStatus::Confirmed, BookingStatus::Cancelled]
        );
    }

    #[test]
    fn test_advance_and_timeline() {
        let engine = RuleEngine::new();
        let (_, booking) = patient_with_booking();

        let confirmed = engine.advance_booking(&booking, BookingStatus::Confirmed, "dispatcher").unwrap();
        let en_route = engine
            .advance_booking(&confirmed.booking, BookingStatus::EnRoute, "crew")
            .unwrap();

        let events: Vec<_> = en_route.event.into_iter().chain(confirmed.event).collect();
        let timeline = engine.timeline(&events);
        assert_eq!(timeline.len(), 2);
        assert!(timeline[0].event.timestamp <= timeline[1].event.timestamp);
    }
}
