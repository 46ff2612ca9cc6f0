use std::fmt;

use crate::dom::NodeId;

/// Token for a scheduled timer; clearing it cancels the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) i64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerTask {
    ExpireBypass { node: NodeId },
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: TimerId,
    pub(crate) due_at: i64,
    order: i64,
    pub(crate) task: TimerTask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: TimerId,
    pub due_at: i64,
    pub order: i64,
}

/// Timers against a virtual clock. Nothing runs until the owner advances
/// time or drains the queue.
#[derive(Debug, Clone)]
pub(crate) struct TimerQueue {
    now_ms: i64,
    tasks: Vec<ScheduledTask>,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self {
            now_ms: 0,
            tasks: Vec::new(),
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl TimerQueue {
    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn set_now_ms(&mut self, now_ms: i64) {
        self.now_ms = now_ms;
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn schedule_timeout(&mut self, task: TimerTask, delay_ms: i64) -> (TimerId, i64) {
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        self.tasks.push(ScheduledTask {
            id,
            due_at,
            order,
            task,
        });
        (id, due_at)
    }

    pub(crate) fn clear(&mut self, id: TimerId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub(crate) fn clear_all(&mut self) -> usize {
        let cleared = self.tasks.len();
        self.tasks.clear();
        cleared
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .tasks
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    /// Removes the earliest task, optionally only if it is due by
    /// `due_limit`.
    pub(crate) fn pop_next(&mut self, due_limit: Option<i64>) -> Option<ScheduledTask> {
        let idx = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.map(|limit| task.due_at <= limit).unwrap_or(true))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)?;
        Some(self.tasks.remove(idx))
    }
}
