// yard/truck.rs - Truck (C6, §4.6)
//
//! The simplest agent in the system: on arrival it sends one REQUEST to the
//! Port Manager carrying its container list, then exits. Nothing ever
//! addresses a truck back, so it never registers itself in the registry.

use actix::prelude::*;
use std::sync::Arc;
use tracing::info;

use crate::acl::{AclMessage, AgentId, Performative, PROTOCOL_REQUEST};
use crate::actor::{self, ActorRegistry};
use crate::content::schemas::{ContainersDeallocationRequest, ACTION_CONTAINERS_DEALLOCATION_REQUEST, PORT_TERMINAL_ONTOLOGY};
use crate::content::ContentManager;

pub struct Truck {
    endpoint: String,
    port_manager_endpoint: String,
    container_jids: Vec<String>,
    registry: ActorRegistry,
    content: Arc<ContentManager>,
}

impl Truck {
    pub fn new(
        endpoint: impl Into<String>,
        port_manager_endpoint: impl Into<String>,
        container_jids: Vec<String>,
        registry: ActorRegistry,
        content: Arc<ContentManager>,
    ) -> Self {
        Self { endpoint: endpoint.into(), port_manager_endpoint: port_manager_endpoint.into(), container_jids, registry, content }
    }
}

impl Actor for Truck {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(truck = %self.endpoint, containers = ?self.container_jids, "truck arrived");

        let request = ContainersDeallocationRequest { container_jids: self.container_jids.clone() };
        let mut msg = AclMessage::new(
            Performative::Request,
            AgentId::from(self.endpoint.as_str()),
            AgentId::from(self.port_manager_endpoint.as_str()),
        )
        .with_protocol(PROTOCOL_REQUEST);
        self.content
            .fill(PORT_TERMINAL_ONTOLOGY, ACTION_CONTAINERS_DEALLOCATION_REQUEST, &request.to_concept(), &mut msg)
            .expect("port_terminal_ontology containers-deallocation-request schema is always registered");
        actor::send(&self.registry, msg);

        ctx.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_truck_carries_its_container_list() {
        let truck = Truck::new("truck1@yard", "port@yard", vec!["c1@yard".into()], ActorRegistry::new(), Arc::new(ContentManager::new()));
        assert_eq!(truck.container_jids, vec!["c1@yard".to_string()]);
    }
}
