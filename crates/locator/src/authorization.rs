//! AuthorizationGate - decides whether a configuration may be applied
//!
//! The gate never mutates the authorization state; it only reads what the
//! sensor reports, remembers which prompts are still unanswered and what
//! the user last answered for each mode.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use contracts::{AuthorizationMode, AuthorizationState, RequestId};

use crate::request::LocationRequest;

/// Gate outcome for one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Authorization covers the configuration
    Granted,
    /// Access refused; pending requests must fail
    Denied,
    /// Ask the sensor to prompt for this mode
    Prompt(AuthorizationMode),
    /// A prompt for the preferred mode is unanswered, or was answered with
    /// the current status
    Waiting,
}

#[derive(Debug, Default)]
pub struct AuthorizationGate {
    declared: Vec<AuthorizationMode>,
    in_flight: BTreeSet<AuthorizationMode>,
    answered: BTreeMap<AuthorizationMode, AuthorizationState>,
}

impl AuthorizationGate {
    pub fn new(declared: Vec<AuthorizationMode>) -> Self {
        Self {
            declared,
            in_flight: BTreeSet::new(),
            answered: BTreeMap::new(),
        }
    }

    /// Decide for a configuration needing `required`
    ///
    /// A `Prompt` decision marks the mode as in flight until
    /// [`prompt_resolved`](Self::prompt_resolved) is called. A mode whose
    /// answer still matches `status` is not asked again.
    pub fn evaluate(
        &mut self,
        status: AuthorizationState,
        required: AuthorizationMode,
    ) -> GateDecision {
        if status.satisfies(required) {
            return GateDecision::Granted;
        }
        if status.is_denied() {
            return GateDecision::Denied;
        }

        let mode = AuthorizationMode::preferred(&self.declared, required);
        if self.answered.get(&mode) == Some(&status) {
            debug!(mode = ?mode, status = ?status, "prompt already answered");
            return GateDecision::Waiting;
        }
        if self.in_flight.insert(mode) {
            GateDecision::Prompt(mode)
        } else {
            debug!(mode = ?mode, "authorization prompt already in flight");
            GateDecision::Waiting
        }
    }

    /// Requests that opted out of prompting and are not covered by `status`
    pub fn opted_out<'a, I>(status: AuthorizationState, requests: I) -> Vec<RequestId>
    where
        I: IntoIterator<Item = &'a LocationRequest>,
    {
        requests
            .into_iter()
            .filter(|r| r.is_pending())
            .filter(|r| r.options().avoid_authorization_prompt)
            .filter(|r| !status.satisfies(r.options().required_authorization()))
            .map(|r| r.id())
            .collect()
    }

    /// The sensor answered a prompt for `mode` with `answer`
    pub fn prompt_resolved(&mut self, mode: AuthorizationMode, answer: AuthorizationState) {
        self.in_flight.remove(&mode);
        self.answered.insert(mode, answer);
    }

    /// An unsolicited change settles every unanswered prompt it satisfies
    pub fn resolve_satisfied(&mut self, state: AuthorizationState) {
        let settled: Vec<_> = self
            .in_flight
            .iter()
            .copied()
            .filter(|mode| state.satisfies(*mode))
            .collect();
        for mode in settled {
            debug!(mode = ?mode, state = ?state, "prompt settled by authorization change");
            self.prompt_resolved(mode, state);
        }
    }

    pub fn is_prompting(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Forget prompts and answers (sensor swapped)
    pub fn reset(&mut self) {
        self.in_flight.clear();
        self.answered.clear();
    }
}
