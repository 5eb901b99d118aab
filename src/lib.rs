// lib.rs - stackyard
//
// A multi-agent seaport container-stacking yard: FIPA-style Contract-Net
// allocation and Request-protocol deallocation/reallocation over a set of
// fixed-height slot stacks, run in-process over actix actors.

pub mod acl;
pub mod actor;
pub mod config;
pub mod content;
pub mod error;
pub mod observability;
pub mod platform;
pub mod protocol;
pub mod yard;

pub use acl::{AclMessage, AgentId, ConversationId, Performative};
pub use actor::{ActorRegistry, AgentError, Deliver};
pub use config::{YardConfig, YardConfigOverrides};
pub use content::{Codec, CodecError, CodecRegistry, Concept, ContentError, ContentManager, Ontology, OntologyRegistry, Schema, SchemaField, Term};
pub use error::YardError;
pub use observability::{init_tracing, TracingConfig, TracingFormat};
pub use platform::DirectoryFacilitator;
pub use protocol::{ContractNetInitiator, ContractNetResponder, RequestInitiator, RequestResponder};
pub use yard::{ContainerAgent, PortManager, SlotManager, Truck};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for binaries wiring up a yard.
pub mod prelude {
    pub use crate::acl::{AclMessage, AgentId, ConversationId, Performative};
    pub use crate::actor::{ActorRegistry, AgentError, Deliver};
    pub use crate::config::YardConfig;
    pub use crate::content::ContentManager;
    pub use crate::error::YardError;
    pub use crate::platform::DirectoryFacilitator;
    pub use crate::yard::{ContainerAgent, PortManager, SlotManager, Truck};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
