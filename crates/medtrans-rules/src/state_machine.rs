//! 转运预约状态机
//!
//! 管理转运预约的完整生命周期状态转换：
//! requested → confirmed → en_route → picked_up → completed，
//! 以及只能从 requested 或 confirmed 进入的终止状态 cancelled。

use chrono::{DateTime, Utc};
use medtrans_core::{Booking, BookingStatus, Result, RulesError, TimelineEvent, TimelinePayload};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 状态转换结果
///
/// 时间线事件与新的预约一同返回，作为同一次转换的组成部分。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub booking: Booking,
    /// 幂等重放（目标状态等于当前状态）时为 `None`
    pub event: Option<TimelineEvent>,
}

impl TransitionOutcome {
    pub fn is_noop(&self) -> bool {
        self.event.is_none()
    }
}

/// 预约状态机
#[derive(Debug)]
pub struct BookingStateMachine {
    transitions: HashSet<(BookingStatus, BookingStatus)>,
}

impl BookingStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashSet::new();

        // 正向流程
        transitions.insert((BookingStatus::Requested, BookingStatus::Confirmed));
        transitions.insert((BookingStatus::Confirmed, BookingStatus::EnRoute));
        transitions.insert((BookingStatus::EnRoute, BookingStatus::PickedUp));
        transitions.insert((BookingStatus::PickedUp, BookingStatus::Completed));
        // 取消
        transitions.insert((BookingStatus::Requested, BookingStatus::Cancelled));
        transitions.insert((BookingStatus::Confirmed, BookingStatus::Cancelled));

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, current: BookingStatus, target: BookingStatus) -> bool {
        self.transitions.contains(&(current, target))
    }

    /// 执行状态转换，使用当前时间
    pub fn apply_transition(
        &self,
        booking: &Booking,
        target: BookingStatus,
        actor: &str,
    ) -> Result<TransitionOutcome> {
        self.apply_transition_at(booking, target, actor, Utc::now())
    }

    /// 执行状态转换
    ///
    /// 成功时返回更新后的预约（状态、updated_at、版本号）以及一条 status_change 事件；
    /// 传入的预约不会被修改。
    pub fn apply_transition_at(
        &self,
        booking: &Booking,
        target: BookingStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let current = booking.status;

        if current == target {
            tracing::debug!("Booking {} already {}, ignoring repeated transition", booking.id, target);
            return Ok(TransitionOutcome {
                booking: booking.clone(),
                event: None,
            });
        }

        if !self.can_transition(current, target) {
            tracing::warn!(
                "Rejected transition for booking {}: {} -> {} by {}",
                booking.id,
                current,
                target,
                actor
            );
            return Err(RulesError::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        let mut updated = booking.clone();
        updated.status = target;
        updated.updated_at = at;
        updated.version += 1;

        let event = TimelineEvent::new(
            booking.id,
            at,
            actor,
            TimelinePayload::StatusChange {
                from: current,
                to: target,
            },
        );

        tracing::info!("Booking {} status updated from {} to {} by {}", booking.id, current, target, actor);

        Ok(TransitionOutcome {
            booking: updated,
            event: Some(event),
        })
    }

    /// 获取所有可能的状态
    pub fn all_statuses() -> Vec<BookingStatus> {
        vec![
            BookingStatus::Requested,
            BookingStatus::Confirmed,
            BookingStatus::EnRoute,
            BookingStatus::PickedUp,
            BookingStatus::Completed,
            BookingStatus::Cancelled,
        ]
    }

    /// 当前状态允许的目标状态，按生命周期顺序排列
    pub fn permitted_transitions(&self, current: BookingStatus) -> Vec<BookingStatus> {
        Self::all_statuses()
            .into_iter()
            .filter(|target| self.can_transition(current, *target))
            .collect()
    }

    /// 正向流程中的下一个状态
    pub fn next_status(&self, current: BookingStatus) -> Option<BookingStatus> {
        self.permitted_transitions(current)
            .into_iter()
            .find(|target| *target != BookingStatus::Cancelled)
    }

    /// 终止状态不再允许任何转换
    pub fn is_terminal(&self, status: BookingStatus) -> bool {
        self.permitted_transitions(status).is_empty()
    }
}

impl Default for BookingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
