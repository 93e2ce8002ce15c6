//! 规则引擎演示程序
//!
//! 展示一次转运的完整流程：记录生命体征、给药前过敏检查、推进预约状态和组装时间线

use chrono::{Duration, Utc};
use medtrans_admin::{init_logging, LoggingConfig};
use medtrans_core::{
    Allergy, AllergySeverity, Booking, BookingNote, BookingStatus, Location, LocationPing, MedicationRequest,
    MedicationRoute, Patient, RulesError, VitalMetric, VitalReading,
};
use medtrans_rules::{Checkpoint, GateOutcome, RuleEngine, TimelineSources};
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    // 初始化日志
    init_logging(&LoggingConfig::default())?;

    let engine = RuleEngine::new();

    println!("🚑 medtrans 规则引擎演示\n");

    // 1. 创建患者与预约
    let mut patient = Patient::new("Demo Patient");
    patient.allergies.push(Allergy::new("latex", AllergySeverity::Severe));
    patient.allergies.push(Allergy::new("penicillin", AllergySeverity::Moderate));

    let mut booking = Booking::new(
        patient.id,
        Location::new("42 Riverside Avenue"),
        Location::new("City General Hospital"),
    );
    println!("✅ 创建预约 {} (状态: {})", booking.id, booking.status);

    // 2. 推进预约状态，收集时间线事件
    let mut sources = TimelineSources::new(booking.id);
    let t0 = Utc::now();
    for (offset, target, actor) in [
        (0, BookingStatus::Confirmed, "dispatcher-1"),
        (10, BookingStatus::EnRoute, "unit-12"),
        (25, BookingStatus::PickedUp, "unit-12"),
    ] {
        let outcome = engine.state_machine().apply_transition_at(
            &booking,
            target,
            actor,
            t0 + Duration::minutes(offset),
        )?;
        sources.events.extend(outcome.event);
        booking = outcome.booking;
        println!("🔄 预约状态: {}", booking.status);
    }

    // 无效转换
    match engine.advance_booking(&booking, BookingStatus::Cancelled, "dispatcher-1") {
        Err(e @ RulesError::InvalidTransition { .. }) => println!("⛔ {}", e),
        other => println!("意外结果: {:?}", other.map(|o| o.booking.status)),
    }
    println!("   允许的下一步: {:?}", engine.permitted_transitions(&booking));

    // 3. 途中记录生命体征
    let recorded_at = t0 + Duration::minutes(30);
    let readings = vec![
        VitalReading::new(patient.id, VitalMetric::SystolicBp, 146.0, recorded_at, "medic-7"),
        VitalReading::new(patient.id, VitalMetric::DiastolicBp, 92.0, recorded_at, "medic-7"),
        VitalReading::new(patient.id, VitalMetric::HeartRate, 104.0, recorded_at, "medic-7"),
        VitalReading::new(patient.id, VitalMetric::OxygenSaturation, 89.0, recorded_at, "medic-7")
            .with_notes("on room air"),
    ];
    let assessment = engine.record_vitals(&patient, &readings)?;
    println!("\n📈 生命体征评估: 最严重等级 {:?}", assessment.worst);
    if let Some(bp) = &assessment.blood_pressure {
        println!("   血压组合: {:?}", bp.severity);
    }
    for alert in &assessment.alerts {
        println!("   🚨 {}", alert.message);
    }
    patient.vitals.extend(readings.iter().cloned());
    sources.vitals.extend(readings);

    // 4. 给药前过敏检查
    let candidate = "Latex-free glove adhesive";
    if let GateOutcome::Warn { allergy } = engine.check_medication(&patient, candidate, Checkpoint::Keystroke) {
        println!("\n⚠️  输入 {:?} 时提示过敏原 {:?}", candidate, allergy.allergen);
    }

    let request = MedicationRequest {
        medication_name: "Salbutamol".to_string(),
        dosage: 2.5,
        unit: "mg".to_string(),
        route: MedicationRoute::Inhalation,
        notes: Some("nebulised".to_string()),
    };
    let administration = engine.administer_medication(&patient, &request, "medic-7")?;
    println!("💊 已给药 {} {} {}", administration.medication_name, administration.dosage, administration.unit);

    // 5. 备注与位置
    sources.notes.push(BookingNote {
        id: Uuid::new_v4(),
        booking_ref: booking.id,
        author_ref: "medic-7".to_string(),
        text: "Patient anxious, oxygen started".to_string(),
        created_at: t0 + Duration::minutes(31),
    });
    sources.pings.push(LocationPing {
        booking_ref: booking.id,
        reported_by: "unit-12".to_string(),
        latitude: 51.507,
        longitude: -0.128,
        recorded_at: t0 + Duration::minutes(18),
    });

    // 6. 时间线
    println!("\n🕒 时间线:");
    for item in engine.timeline_from_sources(&sources)? {
        println!(
            "   {} [{} / {}] {:?}",
            item.event.timestamp.format("%H:%M"),
            item.display.icon,
            item.display.color,
            item.event.event_type
        );
    }

    // 7. 概览
    let overview = engine.overview(&patient, &booking)?;
    println!("\n📊 概览: {}", serde_json::to_string_pretty(&overview)?);

    println!("\n🎉 规则引擎演示完成!");
    Ok(())
}
