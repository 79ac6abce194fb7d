use std::fmt;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::RefreshError;

/// What caused a refresh to be requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The stored token crossed the refresh interval.
    Proactive,
    /// A request came back 401.
    Reactive,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::Proactive => write!(f, "proactive"),
            RefreshTrigger::Reactive => write!(f, "reactive"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    trigger: RefreshTrigger,
}

impl RefreshTelemetry {
    pub fn new(trigger: RefreshTrigger) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            trigger,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            "refresh.start"
        );
    }

    /// A caller found a refresh already running and is waiting on it.
    pub fn emit_joined(&self, trigger: RefreshTrigger) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            trigger = %trigger,
            "refresh.joined"
        );
    }

    /// The store already holds a newer token than the caller saw.
    pub fn emit_superseded(&self) {
        event!(
            Level::DEBUG,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            "refresh.superseded"
        );
    }

    pub fn emit_success(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &RefreshError) {
        event!(
            Level::WARN,
            attempt_id = %self.attempt_id,
            trigger = %self.trigger,
            error = %error,
            "refresh.failure"
        );
    }
}
