//! Guest message-limit gate.
//!
//! A guest may send a fixed number of messages before the chat asks them to
//! log in. The gate is a small state machine:
//!
//! ```text
//! Active(n) --flush k, n+k <  LIMIT--> Active(n+k)
//! Active(n) --flush k, n+k >= LIMIT--> Blocked
//! Active(n) --send while n >= LIMIT--> Blocked      (no backend call)
//! Active/Blocked --login success-----> Unlocked     (guest mode over)
//! ```
//!
//! `Blocked` is terminal for guest mode; only an external authentication
//! success moves the session to `Unlocked`.

use serde::{Deserialize, Serialize};

/// Current position in the guest state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    /// Guest may keep sending; `count` messages already accepted by the backend.
    Active { count: u32 },
    /// Allowance used up. Input stays suspended until the guest logs in.
    Blocked { count: u32 },
    /// Authenticated session (signed in from the start, or converted guest).
    Unlocked { count: u32 },
}

/// Why a login prompt is on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PromptReason {
    /// The guest allowance is exhausted.
    LimitReached { count: u32, limit: u32 },
    /// A feature reserved for signed-in users was tapped.
    LockedFeature { feature: String },
}

/// The modal asking a guest to sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPrompt {
    pub reason: PromptReason,
    /// The limit variant has no dismiss affordance; the locked-feature one does.
    pub dismissible: bool,
}

impl LoginPrompt {
    pub fn limit_reached(count: u32, limit: u32) -> Self {
        Self {
            reason: PromptReason::LimitReached { count, limit },
            dismissible: false,
        }
    }

    pub fn locked_feature(feature: impl Into<String>) -> Self {
        Self {
            reason: PromptReason::LockedFeature {
                feature: feature.into(),
            },
            dismissible: true,
        }
    }
}

/// Outcome of asking the gate whether a new message may be queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDecision {
    Allowed,
    /// The send is rejected before any backend traffic; show the prompt.
    Rejected(LoginPrompt),
}

/// Outcome of applying a successful flush to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Still within the allowance (or not gated at all).
    Continue { count: u32 },
    /// This flush used up the allowance; raise the prompt after the replies.
    Blocked(LoginPrompt),
}

/// Per-session message-limit gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestGate {
    limit: u32,
    state: GateState,
}

impl GuestGate {
    /// Creates a gate for a brand-new guest: `Active(0)`.
    pub fn new(limit: u32) -> Self {
        Self::restore(limit, 0, false)
    }

    /// Reconstructs the gate from a stored message count.
    ///
    /// A count already at or above the limit restores straight into
    /// `Blocked`; a converted guest restores into `Unlocked`.
    pub fn restore(limit: u32, count: u32, converted: bool) -> Self {
        let state = if converted {
            GateState::Unlocked { count }
        } else if count >= limit {
            GateState::Blocked { count }
        } else {
            GateState::Active { count }
        };
        Self { limit, state }
    }

    /// A gate for an authenticated session. Never blocks.
    pub fn unlocked(limit: u32) -> Self {
        Self {
            limit,
            state: GateState::Unlocked { count: 0 },
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn count(&self) -> u32 {
        match self.state {
            GateState::Active { count }
            | GateState::Blocked { count }
            | GateState::Unlocked { count } => count,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.state, GateState::Blocked { .. })
    }

    /// True while the session is still subject to the guest allowance.
    pub fn is_guest(&self) -> bool {
        !matches!(self.state, GateState::Unlocked { .. })
    }

    /// Messages the guest may still send, `None` when not gated.
    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            GateState::Active { count } => Some(self.limit.saturating_sub(count)),
            GateState::Blocked { .. } => Some(0),
            GateState::Unlocked { .. } => None,
        }
    }

    /// Decides whether a new message may be queued.
    ///
    /// An `Active(n)` gate with `n >= LIMIT` moves to `Blocked` here, so the
    /// caller can re-raise the prompt without contacting the backend.
    pub fn check_send(&mut self) -> SendDecision {
        match self.state {
            GateState::Unlocked { .. } => SendDecision::Allowed,
            GateState::Active { count } if count < self.limit => SendDecision::Allowed,
            GateState::Active { count } | GateState::Blocked { count } => {
                self.state = GateState::Blocked { count };
                SendDecision::Rejected(LoginPrompt::limit_reached(count, self.limit))
            }
        }
    }

    /// Applies a flush of `accepted` user messages the backend took.
    ///
    /// Only call this after the flush succeeded; failed flushes must leave
    /// the count alone.
    pub fn record_flush(&mut self, accepted: u32) -> FlushOutcome {
        match self.state {
            GateState::Unlocked { count } => {
                let count = count.saturating_add(accepted);
                self.state = GateState::Unlocked { count };
                FlushOutcome::Continue { count }
            }
            GateState::Active { count } | GateState::Blocked { count } => {
                let count = count.saturating_add(accepted);
                if count >= self.limit {
                    self.state = GateState::Blocked { count };
                    FlushOutcome::Blocked(LoginPrompt::limit_reached(count, self.limit))
                } else {
                    self.state = GateState::Active { count };
                    FlushOutcome::Continue { count }
                }
            }
        }
    }

    /// External authentication succeeded; guest-mode gating ends.
    pub fn mark_converted(&mut self) {
        self.state = GateState::Unlocked { count: self.count() };
    }
}
