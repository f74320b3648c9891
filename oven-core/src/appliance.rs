//! Microwave countdown state machine
//!
//! The oven is a plain value: the caller loads it for a session, applies
//! one operation with the current instant, and stores it back. There is no
//! ticking timer. Each operation first reconciles the countdown against
//! the wall clock, so the remaining time is always derived from how many
//! seconds passed since the last observation.
//!
//! States: idle (`active == false`), running, paused. A running cycle whose
//! countdown reaches zero is reported as completed once and folds back to
//! idle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest cycle a user may type in, in seconds
pub const MAX_MANUAL_TIME: u32 = 120;

/// Power range accepted by the oven
pub const MIN_POWER: u8 = 1;
pub const MAX_POWER: u8 = 10;

/// Quick start: cycle length when idle, and increment when running
pub const QUICK_START_TIME: u32 = 30;
pub const QUICK_START_POWER: u8 = 10;

/// Input rejected before touching the state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("time must be greater than zero")]
    TimeNotPositive,

    #[error("time must be at most 120 seconds")]
    TimeTooLong,

    #[error("power must be between 1 and 10")]
    PowerOutOfRange,
}

/// Operation not allowed in the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no active heating to pause")]
    NothingToPause,

    #[error("heating is already paused")]
    AlreadyPaused,

    #[error("heating has already completed")]
    AlreadyCompleted,

    #[error("no active heating to resume")]
    NothingToResume,

    #[error("heating is not paused")]
    NotPaused,

    #[error("no active heating to cancel")]
    NothingToCancel,

    #[error("heating is paused; resume or cancel it first")]
    PausedCannotExtend,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplianceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Persisted state of one oven
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceState {
    /// A heating cycle exists (not completed or cancelled)
    pub active: bool,
    pub remaining_seconds: u32,
    /// Power of the current or last cycle; 0 before the first start
    pub power: u8,
    pub paused: bool,
    /// Unix seconds of the last reconciliation
    pub last_update_timestamp: i64,
}

/// Result of a successful start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    pub time: u32,
    pub power: u8,
    pub paused: bool,
}

/// Reconciled view returned by [`ApplianceState::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Inactive,
    Completed,
    Active { time: u32, power: u8, paused: bool },
}

/// Check a cycle length. Predefined programs skip the manual ceiling.
pub fn validate_time(time: u32, is_predefined: bool) -> Result<(), ValidationError> {
    if time == 0 {
        return Err(ValidationError::TimeNotPositive);
    }
    if !is_predefined && time > MAX_MANUAL_TIME {
        return Err(ValidationError::TimeTooLong);
    }
    Ok(())
}

pub fn validate_power(power: u8) -> Result<(), ValidationError> {
    if !(MIN_POWER..=MAX_POWER).contains(&power) {
        return Err(ValidationError::PowerOutOfRange);
    }
    Ok(())
}

impl ApplianceState {
    /// Start a new cycle, replacing whatever was running
    pub fn start(&mut self, time: u32, power: u8, is_predefined: bool, now: i64) -> Result<Started, ApplianceError> {
        validate_time(time, is_predefined)?;
        validate_power(power)?;

        *self = Self {
            active: true,
            remaining_seconds: time,
            power,
            paused: false,
            last_update_timestamp: now,
        };

        Ok(Started {
            time,
            power,
            paused: false,
        })
    }

    /// Freeze the countdown, returning the remaining seconds
    pub fn pause(&mut self, now: i64) -> Result<u32, ApplianceError> {
        if !self.active {
            return Err(StateError::NothingToPause.into());
        }
        if self.paused {
            return Err(StateError::AlreadyPaused.into());
        }

        self.reconcile(now);
        if self.remaining_seconds == 0 {
            self.active = false;
            return Err(StateError::AlreadyCompleted.into());
        }

        self.paused = true;
        Ok(self.remaining_seconds)
    }

    /// Unfreeze the countdown; time accrues again from `now`
    pub fn resume(&mut self, now: i64) -> Result<u32, ApplianceError> {
        if !self.active {
            return Err(StateError::NothingToResume.into());
        }
        if !self.paused {
            return Err(StateError::NotPaused.into());
        }

        self.paused = false;
        self.last_update_timestamp = now;
        Ok(self.remaining_seconds)
    }

    /// Reconcile and report. A finished cycle reports `Completed` once.
    pub fn status(&mut self, now: i64) -> Status {
        if !self.active {
            return Status::Inactive;
        }

        self.reconcile(now);
        if self.remaining_seconds == 0 {
            self.active = false;
            return Status::Completed;
        }

        Status::Active {
            time: self.remaining_seconds,
            power: self.power,
            paused: self.paused,
        }
    }

    /// Abort the current cycle, running or paused
    pub fn cancel(&mut self, now: i64) -> Result<(), ApplianceError> {
        if !self.active {
            return Err(StateError::NothingToCancel.into());
        }

        *self = Self {
            last_update_timestamp: now,
            ..Self::default()
        };
        Ok(())
    }

    /// Front-panel quick start: start a short full-power cycle when idle,
    /// or add time to a running one (never past the manual ceiling).
    pub fn quick_start(&mut self, now: i64) -> Result<Started, ApplianceError> {
        if let Status::Active { time, power, paused } = self.status(now) {
            if paused {
                return Err(StateError::PausedCannotExtend.into());
            }

            let extended = time.saturating_add(QUICK_START_TIME).min(MAX_MANUAL_TIME).max(time);
            self.remaining_seconds = extended;
            return Ok(Started {
                time: extended,
                power,
                paused: false,
            });
        }

        self.start(QUICK_START_TIME, QUICK_START_POWER, false, now)
    }

    /// Advance the countdown by the wall-clock time since the last
    /// observation. Only a running, unpaused cycle moves.
    fn reconcile(&mut self, now: i64) {
        if self.active && !self.paused {
            let elapsed = now.saturating_sub(self.last_update_timestamp).max(0);
            let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
            self.remaining_seconds = self.remaining_seconds.saturating_sub(elapsed);
            self.last_update_timestamp = now;
        }
    }
}
