//! 时间线组装
//!
//! 将状态变更、备注、生命体征记录和位置上报合并为按时间排序的统一事件序列。

use chrono::{DateTime, Utc};
use medtrans_core::{
    BookingNote, LocationPing, Result, TimelineEvent, TimelineEventType, TimelinePayload, VitalReading,
    VitalSnapshot,
};
use serde::Serialize;
use uuid::Uuid;

use crate::vitals::VitalClassifier;

/// 显示图标与颜色
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DisplayKey {
    pub icon: &'static str,
    pub color: &'static str,
}

/// 事件类型对应的显示键
pub fn display_key(event_type: TimelineEventType) -> DisplayKey {
    match event_type {
        TimelineEventType::StatusChange => DisplayKey { icon: "swap_horiz", color: "primary" },
        TimelineEventType::Note => DisplayKey { icon: "sticky_note", color: "secondary" },
        TimelineEventType::VitalsRecorded => DisplayKey { icon: "monitor_heart", color: "error" },
        TimelineEventType::LocationUpdate => DisplayKey { icon: "location_on", color: "info" },
    }
}

/// 可渲染的时间线事件
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderableEvent {
    pub event: TimelineEvent,
    pub display: DisplayKey,
    /// 仅 vitals_recorded 事件携带，记录时的数值快照
    pub vitals: Option<Vec<VitalSnapshot>>,
}

impl RenderableEvent {
    fn from_event(event: &TimelineEvent) -> Self {
        let vitals = match &event.payload {
            TimelinePayload::VitalsRecorded { snapshot } => Some(snapshot.clone()),
            _ => None,
        };

        Self {
            display: display_key(event.payload.event_type()),
            event: event.clone(),
            vitals,
        }
    }
}

/// 按时间排序的惰性事件序列
///
/// 排序在创建时完成，渲染在迭代时逐个进行。
#[derive(Debug, Clone)]
pub struct Assembled<'a> {
    events: &'a [TimelineEvent],
    order: std::vec::IntoIter<usize>,
}

impl Iterator for Assembled<'_> {
    type Item = RenderableEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.order
            .next()
            .map(|index| RenderableEvent::from_event(&self.events[index]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl ExactSizeIterator for Assembled<'_> {}

/// 时间戳升序排序，时间相同时保持输入顺序
pub fn assemble(events: &[TimelineEvent]) -> Assembled<'_> {
    let mut order: Vec<usize> = (0..events.len()).collect();
    // sort_by_key 是稳定排序
    order.sort_by_key(|&index| events[index].timestamp);

    Assembled {
        events,
        order: order.into_iter(),
    }
}

/// 由备注生成事件
pub fn note_event(note: &BookingNote) -> TimelineEvent {
    TimelineEvent::new(
        note.booking_ref,
        note.created_at,
        note.author_ref.clone(),
        TimelinePayload::Note {
            text: note.text.clone(),
        },
    )
}

/// 由位置上报生成事件
pub fn location_event(ping: &LocationPing) -> TimelineEvent {
    TimelineEvent::new(
        ping.booking_ref,
        ping.recorded_at,
        ping.reported_by.clone(),
        TimelinePayload::LocationUpdate {
            latitude: ping.latitude,
            longitude: ping.longitude,
        },
    )
}

/// 由一次生命体征记录生成事件，数值在此刻复制为快照
pub fn vitals_event(
    booking_ref: Uuid,
    readings: &[VitalReading],
    author_ref: &str,
    recorded_at: DateTime<Utc>,
    classifier: &VitalClassifier,
) -> Result<TimelineEvent> {
    let snapshot = readings
        .iter()
        .map(|reading| classifier.snapshot(reading))
        .collect::<Result<Vec<_>>>()?;

    Ok(TimelineEvent::new(
        booking_ref,
        recorded_at,
        author_ref,
        TimelinePayload::VitalsRecorded { snapshot },
    ))
}

/// 时间线的原始事件来源
#[derive(Debug, Clone, Default)]
pub struct TimelineSources {
    pub booking_ref: Uuid,
    /// 已有的时间线事件（通常是状态变更）
    pub events: Vec<TimelineEvent>,
    pub notes: Vec<BookingNote>,
    pub vitals: Vec<VitalReading>,
    pub pings: Vec<LocationPing>,
}

impl TimelineSources {
    pub fn new(booking_ref: Uuid) -> Self {
        Self {
            booking_ref,
            ..Default::default()
        }
    }

    /// 合并为事件列表
    ///
    /// 同一时间、同一记录人的生命体征读数归为一次记录事件。
    pub fn merge(&self, classifier: &VitalClassifier) -> Result<Vec<TimelineEvent>> {
        let mut merged = self.events.clone();
        merged.extend(self.notes.iter().map(note_event));

        let mut sessions: Vec<((DateTime<Utc>, &str), Vec<VitalReading>)> = Vec::new();
        for reading in &self.vitals {
            let key = (reading.recorded_at, reading.recorded_by.as_str());
            match sessions.iter_mut().find(|(k, _)| *k == key) {
                Some((_, readings)) => readings.push(reading.clone()),
                None => sessions.push((key, vec![reading.clone()])),
            }
        }
        for ((recorded_at, author), readings) in &sessions {
            merged.push(vitals_event(self.booking_ref, readings, author, *recorded_at, classifier)?);
        }

        merged.extend(self.pings.iter().map(location_event));

        tracing::debug!("Merged {} timeline events for booking {}", merged.len(), self.booking_ref);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use medtrans_core::{BookingStatus, Severity, VitalMetric};

    fn status_event(booking: Uuid, at: DateTime<Utc>, to: BookingStatus) -> TimelineEvent {
        TimelineEvent::new(
            booking,
            at,
            "dispatcher",
            TimelinePayload::StatusChange {
                from: BookingStatus::Requested,
                to,
            },
        )
    }

    #[test]
    fn test_out_of_order_input_sorted() {
        let booking = Uuid::new_v4();
        let t1 = Utc::now();
        let t2 = t1 + Duration::minutes(1);
        let t3 = t1 + Duration::minutes(2);
        let events = vec![
            status_event(booking, t2, BookingStatus::Confirmed),
            status_event(booking, t1, BookingStatus::Confirmed),
            status_event(booking, t3, BookingStatus::Confirmed),
        ];

        let timestamps: Vec<_> = assemble(&events).map(|e| e.event.timestamp).collect();
        assert_eq!(timestamps, vec![t1, t2, t3]);
    }

    #[test]
    fn test_display_follows_payload() {
        let mut event = TimelineEvent::new(
            Uuid::new_v4(),
            Utc::now(),
            "crew-7",
            TimelinePayload::Note { text: "hi".to_string() },
        );
        event.event_type = TimelineEventType::VitalsRecorded;

        let item = assemble(std::slice::from_ref(&event)).next().unwrap();
        assert_eq!(item.display, display_key(TimelineEventType::Note));
        assert!(item.vitals.is_none());
    }

    #[test]
    fn test_assemble_is_restartable() {
        let booking = Uuid::new_v4();
        let t1 = Utc::now();
        let events = vec![
            status_event(booking, t1 + Duration::seconds(30), BookingStatus::Confirmed),
            status_event(booking, t1, BookingStatus::Cancelled),
        ];

        let first: Vec<_> = assemble(&events).collect();
        let second: Vec<_> = assemble(&events).collect();
        assert_eq!(first, second);
        assert_eq!(assemble(&events).len(), 2);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let booking = Uuid::new_v4();
        let at = Utc::now();
        let events: Vec<_> = (0..5)
            .map(|i| {
                TimelineEvent::new(
                    booking,
                    at,
                    "crew",
                    TimelinePayload::Note { text: format!("note {}", i) },
                )
            })
            .collect();

        let ids: Vec<_> = assemble(&events).map(|e| e.event.id).collect();
        let expected: Vec<_> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_display_keys_and_vitals_snapshot() {
        let classifier = VitalClassifier::standard();
        let booking = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let at = Utc::now();
        let mut readings = vec![
            VitalReading::new(patient, VitalMetric::HeartRate, 112.0, at, "medic-4"),
            VitalReading::new(patient, VitalMetric::OxygenSaturation, 97.0, at, "medic-4"),
        ];

        let event = vitals_event(booking, &readings, "medic-4", at, &classifier).unwrap();
        // 快照不随原始读数变化
        readings[0].value = 70.0;

        let rendered: Vec<_> = assemble(std::slice::from_ref(&event)).collect();
        assert_eq!(rendered[0].display, display_key(TimelineEventType::VitalsRecorded));
        let snapshot = rendered[0].vitals.as_ref().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].value, 112.0);
        assert_eq!(snapshot[0].severity, Severity::Warning);
        assert_eq!(snapshot[1].severity, Severity::Normal);
    }

    #[test]
    fn test_merge_sources() {
        let classifier = VitalClassifier::standard();
        let booking = Uuid::new_v4();
        let patient = Uuid::new_v4();
        let t0 = Utc::now();

        let mut sources = TimelineSources::new(booking);
        sources.events.push(status_event(booking, t0, BookingStatus::Confirmed));
        sources.notes.push(BookingNote {
            id: Uuid::new_v4(),
            booking_ref: booking,
            author_ref: "dispatcher".to_string(),
            text: "wheelchair required".to_string(),
            created_at: t0 + Duration::minutes(10),
        });
        sources.vitals.push(VitalReading::new(patient, VitalMetric::HeartRate, 80.0, t0 + Duration::minutes(5), "medic"));
        sources.vitals.push(VitalReading::new(patient, VitalMetric::Temperature, 37.0, t0 + Duration::minutes(5), "medic"));
        sources.pings.push(LocationPing {
            booking_ref: booking,
            reported_by: "unit-12".to_string(),
            latitude: 51.5,
            longitude: -0.12,
            recorded_at: t0 + Duration::minutes(2),
        });

        let merged = sources.merge(&classifier).unwrap();
        assert_eq!(merged.len(), 4);

        let types: Vec<_> = assemble(&merged).map(|e| e.event.event_type).collect();
        assert_eq!(
            types,
            vec![
                TimelineEventType::StatusChange,
                TimelineEventType::LocationUpdate,
                TimelineEventType::VitalsRecorded,
                TimelineEventType::Note,
            ]
        );
    }
}
