// protocol/contract_net.rs - reusable Contract-Net initiator and responder
//
//! §4.3. The initiator fans out CFPs, collects one response per recipient,
//! lets the caller split proposals into acceptances/rejections, then
//! collects one terminal result per acceptance. The responder is the
//! two-state flip on the other side of one CFP.

use crate::acl::{AclMessage, AgentId, Performative};
use std::fmt;

/// A PROPOSE or REFUSE response to one CFP recipient.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub bidder: AgentId,
    pub body: String,
    pub refused: bool,
}

/// What the initiator should do after recording one response or one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitMore,
    AllIn,
}

/// States: `PrepareCFPs → AwaitResponses → AllResponsesIn → AwaitResults →
/// AllResultsIn → Finalized`. `PrepareCFPs`/`AllResponsesIn`/`AllResultsIn`
/// are instantaneous: the caller drives them by calling `proposals()` and
/// `finalize_decisions()` the moment `record_response`/`record_result`
/// reports `Phase::AllIn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitResponses,
    AwaitResults,
    Finalized,
}

#[derive(Debug)]
pub struct ContractNetInitiator {
    state: State,
    expected_responses: usize,
    proposals: Vec<Proposal>,
    expected_results: usize,
    results: Vec<AclMessage>,
}

impl ContractNetInitiator {
    /// `n` is the number of CFPs sent (§4.3 step 1).
    pub fn new(n: usize) -> Self {
        Self {
            state: State::AwaitResponses,
            expected_responses: n,
            proposals: Vec::new(),
            expected_results: 0,
            results: Vec::new(),
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitResponses => "await_responses",
            State::AwaitResults => "await_results",
            State::Finalized => "finalized",
        }
    }

    /// Record a PROPOSE/REFUSE/NOT_UNDERSTOOD reply to a CFP.
    pub fn record_response(&mut self, msg: AclMessage) -> Phase {
        debug_assert_eq!(self.state, State::AwaitResponses);
        let refused = msg.performative() != Some(Performative::Propose);
        self.proposals.push(Proposal { bidder: msg.sender, body: msg.body, refused });
        if self.proposals.len() >= self.expected_responses {
            Phase::AllIn
        } else {
            Phase::AwaitMore
        }
    }

    /// All PROPOSE/REFUSE replies are in; inspect them to decide who wins.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.proposals.iter().filter(|p| !p.refused)
    }

    /// Record the caller's split and move to `AwaitResults` (§4.3 step 3).
    pub fn finalize_decisions(&mut self, expected_results: usize) {
        self.expected_results = expected_results;
        self.state = State::AwaitResults;
        if self.expected_results == 0 {
            self.state = State::Finalized;
        }
    }

    /// Record an INFORM/FAILURE terminal result from an accepted bidder.
    pub fn record_result(&mut self, msg: AclMessage) -> Phase {
        debug_assert_eq!(self.state, State::AwaitResults);
        self.results.push(msg);
        if self.results.len() >= self.expected_results {
            self.state = State::Finalized;
            Phase::AllIn
        } else {
            Phase::AwaitMore
        }
    }

    pub fn results(&self) -> &[AclMessage] {
        &self.results
    }

    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }
}

/// States: `AwaitCFP → AwaitDecision`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    AwaitCfp,
    AwaitDecision,
}

impl fmt::Display for ResponderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponderState::AwaitCfp => write!(f, "await_cfp"),
            ResponderState::AwaitDecision => write!(f, "await_decision"),
        }
    }
}

/// Tracks only the state flip; the caller supplies `handleCFP`/`handleAccept`
/// behavior directly (§4.4's responder logic is per-domain).
#[derive(Debug, Clone, Copy)]
pub struct ContractNetResponder {
    state: ResponderState,
}

impl ContractNetResponder {
    pub fn new() -> Self {
        Self { state: ResponderState::AwaitCfp }
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Call after replying to a CFP: `PROPOSE` moves to `AwaitDecision`,
    /// anything else (REFUSE) stays at `AwaitCfp`.
    pub fn on_cfp_replied(&mut self, reply_performative: Performative) {
        self.state = if reply_performative == Performative::Propose {
            ResponderState::AwaitDecision
        } else {
            ResponderState::AwaitCfp
        };
    }

    /// Call after handling ACCEPT_PROPOSAL/REJECT_PROPOSAL: always returns
    /// to `AwaitCfp`.
    pub fn on_decision_handled(&mut self) {
        self.state = ResponderState::AwaitCfp;
    }
}

impl Default for ContractNetResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn propose(slot: &str) -> AclMessage {
        AclMessage::new(Performative::Propose, AgentId::from(slot), AgentId::from("c1@yard")).with_body("E=0")
    }

    #[test]
    fn initiator_waits_for_one_response_per_cfp_then_lets_caller_decide() {
        let mut initiator = ContractNetInitiator::new(2);
        assert_eq!(initiator.record_response(propose("s1@yard")), Phase::AwaitMore);
        assert_eq!(initiator.record_response(propose("s2@yard")), Phase::AllIn);
        assert_eq!(initiator.proposals().count(), 2);

        initiator.finalize_decisions(1);
        let reply = AclMessage::new(Performative::Inform, AgentId::from("s1@yard"), AgentId::from("c1@yard"));
        assert_eq!(initiator.record_result(reply), Phase::AllIn);
        assert!(initiator.is_finalized());
    }

    #[test]
    fn zero_acceptances_finalizes_immediately() {
        let mut initiator = ContractNetInitiator::new(1);
        let refuse = AclMessage::new(Performative::Refuse, AgentId::from("s1@yard"), AgentId::from("c1@yard"));
        initiator.record_response(refuse);
        initiator.finalize_decisions(0);
        assert!(initiator.is_finalized());
    }

    #[test]
    fn responder_returns_to_await_cfp_after_refuse() {
        let mut responder = ContractNetResponder::new();
        responder.on_cfp_replied(Performative::Refuse);
        assert_eq!(responder.state(), ResponderState::AwaitCfp);

        responder.on_cfp_replied(Performative::Propose);
        assert_eq!(responder.state(), ResponderState::AwaitDecision);
        responder.on_decision_handled();
        assert_eq!(responder.state(), ResponderState::AwaitCfp);
    }
}
