// protocol/request.rs - reusable Request initiator and responder
//
//! §4.3. The initiator sends all requests and classifies each reply:
//! AGREE/REFUSE/NOT_UNDERSTOOD are intermediate (non-AGREE decrements the
//! expected-result count); INFORM/FAILURE are terminal. The responder is
//! the two-state flip `AwaitRequest → AgreedPendingResult`; on the
//! `AgreedPendingResult` transition the caller must hold the agent's
//! exclusive lock until the terminal notification is sent (§4.3).

use crate::acl::{AclMessage, Performative};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitMore,
    AllIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Await,
    Finalized,
}

/// States: `Init → Await → AllResultsIn → Finalized`.
#[derive(Debug)]
pub struct RequestInitiator {
    state: State,
    expected: usize,
    terminal: Vec<AclMessage>,
}

impl RequestInitiator {
    pub fn new(expected: usize) -> Self {
        Self { state: State::Await, expected, terminal: Vec::new() }
    }

    pub fn record_reply(&mut self, msg: AclMessage) -> Phase {
        match msg.performative() {
            Some(Performative::Agree) => {}
            Some(Performative::Inform) | Some(Performative::Failure) => {
                self.terminal.push(msg);
            }
            _ => {
                // REFUSE / NOT_UNDERSTOOD: one fewer terminal result expected (§4.3).
                self.expected = self.expected.saturating_sub(1);
            }
        }
        if self.terminal.len() >= self.expected {
            self.state = State::Finalized;
            Phase::AllIn
        } else {
            Phase::AwaitMore
        }
    }

    pub fn results(&self) -> &[AclMessage] {
        &self.terminal
    }

    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    pub fn all_succeeded(&self) -> bool {
        self.terminal.iter().all(|m| m.performative() == Some(Performative::Inform))
    }
}

/// States: `AwaitRequest → AgreedPendingResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    AwaitRequest,
    AgreedPendingResult,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestResponder {
    state: ResponderState,
}

impl RequestResponder {
    pub fn new() -> Self {
        Self { state: ResponderState::AwaitRequest }
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Call after `prepareResponse` sends its reply: AGREE moves to
    /// `AgreedPendingResult` and the caller must now hold the lock; anything
    /// else stays at `AwaitRequest`.
    pub fn on_response_sent(&mut self, reply_performative: Performative) {
        self.state = if reply_performative == Performative::Agree {
            ResponderState::AgreedPendingResult
        } else {
            ResponderState::AwaitRequest
        };
    }

    /// Call after `prepareResultNotification` sends the terminal reply:
    /// always returns to `AwaitRequest` and the lock may be released.
    pub fn on_result_sent(&mut self) {
        self.state = ResponderState::AwaitRequest;
    }
}

impl Default for RequestResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::AgentId;

    fn msg(performative: Performative) -> AclMessage {
        AclMessage::new(performative, AgentId::from("a@yard"), AgentId::from("b@yard"))
    }

    #[test]
    fn refuse_decrements_expected_terminal_count() {
        let mut initiator = RequestInitiator::new(2);
        assert_eq!(initiator.record_reply(msg(Performative::Refuse)), Phase::AwaitMore);
        assert_eq!(initiator.record_reply(msg(Performative::Inform)), Phase::AllIn);
        assert!(initiator.is_finalized());
        assert!(initiator.all_succeeded());
    }

    #[test]
    fn agree_is_intermediate_and_does_not_count_as_terminal() {
        let mut initiator = RequestInitiator::new(1);
        assert_eq!(initiator.record_reply(msg(Performative::Agree)), Phase::AwaitMore);
        assert_eq!(initiator.record_reply(msg(Performative::Inform)), Phase::AllIn);
    }

    #[test]
    fn responder_lock_window_spans_agree_to_terminal_reply() {
        let mut responder = RequestResponder::new();
        responder.on_response_sent(Performative::Agree);
        assert_eq!(responder.state(), ResponderState::AgreedPendingResult);
        responder.on_result_sent();
        assert_eq!(responder.state(), ResponderState::AwaitRequest);
    }

    #[test]
    fn responder_stays_put_on_refuse() {
        let mut responder = RequestResponder::new();
        responder.on_response_sent(Performative::Refuse);
        assert_eq!(responder.state(), ResponderState::AwaitRequest);
    }
}
