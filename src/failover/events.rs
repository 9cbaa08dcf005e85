//! Failover event log.
//!
//! A fixed-capacity ring: once full, each append overwrites the oldest
//! entry. Occupancy is tracked explicitly so no timestamp value is reserved
//! as an "empty" marker.

use serde::{Deserialize, Serialize};

/// Number of events retained.
pub const EVENT_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverEventType {
    Failover,
    Recovery,
    CircuitBreakerOpen,
    CircuitBreakerClosed,
}

impl FailoverEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailoverEventType::Failover => "failover",
            FailoverEventType::Recovery => "recovery",
            FailoverEventType::CircuitBreakerOpen => "circuit_breaker_open",
            FailoverEventType::CircuitBreakerClosed => "circuit_breaker_closed",
        }
    }
}

impl std::fmt::Display for FailoverEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverEvent {
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub event_type: FailoverEventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_provider: Option<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_score: Option<f64>,
}

impl FailoverEvent {
    pub fn new(timestamp: u64, event_type: FailoverEventType, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            event_type,
            from_provider: None,
            to_provider: None,
            reason: reason.into(),
            health_score: None,
        }
    }

    pub fn from_provider(mut self, name: impl Into<String>) -> Self {
        self.from_provider = Some(name.into());
        self
    }

    pub fn to_provider(mut self, name: impl Into<String>) -> Self {
        self.to_provider = Some(name.into());
        self
    }

    pub fn health_score(mut self, score: f64) -> Self {
        self.health_score = Some(score);
        self
    }
}

/// Fixed-capacity ring buffer of events.
#[derive(Debug, Clone)]
pub struct EventLog {
    slots: Vec<FailoverEvent>,
    /// Index the next append writes to once the ring is full.
    head: usize,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn push(&mut self, event: FailoverEvent) {
        if self.slots.len() < self.capacity {
            self.slots.push(event);
        } else {
            self.slots[self.head] = event;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copies of all retained events, oldest first by timestamp.
    pub fn snapshot(&self) -> Vec<FailoverEvent> {
        let mut events = Vec::with_capacity(self.slots.len());
        events.extend_from_slice(&self.slots[self.head..]);
        events.extend_from_slice(&self.slots[..self.head]);
        // Insertion order already matches time order unless the clock stepped back.
        events.sort_by_key(|e| e.timestamp);
        events
    }
}
