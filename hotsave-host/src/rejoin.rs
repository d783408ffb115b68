//! Client rejoin controller.
//!
//! A tick-polled state machine that reopens the local session once a
//! restore completes. It never calls the host itself: [`RejoinController::poll`]
//! says what to do this tick and [`RejoinController::record_attempt`] takes
//! the result of a reopen.
//!
//! ```text
//! armed ──settle ticks──> session open? ──yes──> RequestTeardown
//!                               │                      │
//!                               no       closed + teardown ticks
//!                               ▼                      ▼
//!                            Reopen <───────────────────┘
//!                               │
//!          ok: Rejoined / err: Retrying (re-armed) or Exhausted (reset)
//! ```

use hotsave_core::{FolderId, RejoinSettings};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejoinState {
    pub world_to_rejoin: Option<FolderId>,
    pub ready_to_rejoin: bool,
    pub ticks_waited: u32,
    pub retry_count: u32,
    pub awaiting_teardown: bool,
    pub teardown_ticks: u32,
    pub attempt_in_flight: bool,
}

/// What the caller should do on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejoinAction {
    /// Not armed.
    Idle,
    Waiting,
    /// Close the open session; reopening waits until it is gone.
    RequestTeardown,
    /// Reopen this dataset, then report back through `record_attempt`.
    Reopen(FolderId),
    /// The old session never went away; count it as a failed attempt.
    TeardownTimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejoinOutcome {
    Rejoined,
    /// Re-armed with the same identifier; `attempt` failures so far.
    Retrying { attempt: u32 },
    /// Retries used up; state has been reset.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct RejoinController {
    settings: RejoinSettings,
    state: RejoinState,
}

impl RejoinController {
    pub fn new(settings: RejoinSettings) -> Self {
        Self {
            settings,
            state: RejoinState::default(),
        }
    }

    pub fn state(&self) -> &RejoinState {
        &self.state
    }

    pub fn max_retries(&self) -> u32 {
        self.settings.max_retries
    }

    pub fn is_armed(&self) -> bool {
        self.state.ready_to_rejoin && self.state.world_to_rejoin.is_some()
    }

    /// Arm for a fresh rejoin of `world`, clearing any earlier progress.
    pub fn arm(&mut self, world: FolderId) {
        tracing::info!(world = %world, "rejoin armed");
        self.state = RejoinState {
            world_to_rejoin: Some(world),
            ready_to_rejoin: true,
            ..RejoinState::default()
        };
    }

    pub fn reset(&mut self) {
        self.state = RejoinState::default();
    }

    pub fn poll(&mut self, session_open: bool) -> RejoinAction {
        if !self.is_armed() || self.state.attempt_in_flight {
            return if self.is_armed() {
                RejoinAction::Waiting
            } else {
                RejoinAction::Idle
            };
        }

        if self.state.ticks_waited < self.settings.settle_ticks {
            self.state.ticks_waited += 1;
            return RejoinAction::Waiting;
        }

        if self.state.awaiting_teardown {
            self.state.teardown_ticks += 1;
            if session_open {
                if self.state.teardown_ticks >= self.settings.teardown_timeout_ticks {
                    self.state.awaiting_teardown = false;
                    self.state.attempt_in_flight = true;
                    return RejoinAction::TeardownTimedOut;
                }
                return RejoinAction::Waiting;
            }
            if self.state.teardown_ticks < self.settings.teardown_ticks {
                return RejoinAction::Waiting;
            }
            self.state.awaiting_teardown = false;
        } else if session_open {
            self.state.awaiting_teardown = true;
            self.state.teardown_ticks = 0;
            return RejoinAction::RequestTeardown;
        }

        match self.state.world_to_rejoin.clone() {
            Some(world) => {
                self.state.attempt_in_flight = true;
                RejoinAction::Reopen(world)
            }
            None => RejoinAction::Idle,
        }
    }

    pub fn record_attempt(&mut self, success: bool) -> RejoinOutcome {
        if success {
            self.reset();
            return RejoinOutcome::Rejoined;
        }

        self.state.retry_count += 1;
        let attempt = self.state.retry_count;
        if attempt >= self.settings.max_retries {
            tracing::warn!(attempt, "rejoin retries exhausted");
            self.reset();
            return RejoinOutcome::Exhausted;
        }

        self.state.ticks_waited = 0;
        self.state.awaiting_teardown = false;
        self.state.teardown_ticks = 0;
        self.state.attempt_in_flight = false;
        RejoinOutcome::Retrying { attempt }
    }
}
