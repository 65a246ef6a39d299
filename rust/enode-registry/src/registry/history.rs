//! Update History
//!
//! Ring buffer of reported update completions. Arrival order is preserved;
//! once full, each new event evicts the oldest one.

use std::collections::VecDeque;

use crate::types::UpdateEvent;

/// Bounded append-only event log
#[derive(Debug, Clone)]
pub struct UpdateHistory {
    events: VecDeque<UpdateEvent>,
    capacity: usize,
}

impl UpdateHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: UpdateEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// The `limit` most recent events, newest first
    pub fn recent(&self, limit: usize) -> Vec<UpdateEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
