// protocol/mod.rs - Interaction Behaviors (C3)
//
//! Two reusable FIPA interaction protocols, each as an initiator/responder
//! pair (§4.3): Contract-Net for allocation auctions, Request for
//! deallocation/reallocation request-reply flows.

mod contract_net;
mod request;

pub use contract_net::{ContractNetInitiator, ContractNetResponder, Phase as ContractNetPhase, Proposal, ResponderState as ContractNetResponderState};
pub use request::{Phase as RequestPhase, RequestInitiator, RequestResponder, ResponderState as RequestResponderState};
