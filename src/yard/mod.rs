// yard/mod.rs - Domain agents (C3-C6)
//
//! The stacking-yard agents: slot managers own a physical stack each,
//! container agents run the allocation/deallocation initiators, the port
//! manager serializes outbound truck traffic, and trucks are one-shot
//! message originators.

mod container_agent;
mod port_manager;
mod slot_manager;
mod truck;

pub use container_agent::ContainerAgent;
pub use port_manager::PortManager;
pub use slot_manager::SlotManager;
pub use truck::Truck;

#[cfg(test)]
mod integration_tests {
    //! Drives a real allocation round over actix mailboxes end to end,
    //! rather than calling handler methods synchronously (Scenario S1).

    use super::container_agent::ProbeSlotId;
    use super::slot_manager::ProbeStackHeight;
    use super::{ContainerAgent, SlotManager};
    use crate::actor::ActorRegistry;
    use crate::content::ContentManager;
    use crate::platform::DirectoryFacilitator;
    use actix::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[actix_rt::test]
    async fn scenario_s1_places_a_lone_container_in_one_of_two_empty_slots() {
        let registry = ActorRegistry::new();
        let content = Arc::new(ContentManager::new());
        let df_endpoint = "df@yard.test";

        let df = DirectoryFacilitator::new(df_endpoint, registry.clone(), content.clone()).start();
        registry.register(df_endpoint, df.recipient());

        let slot0 = SlotManager::new("0", "slot0@yard.test", 2, df_endpoint, registry.clone(), content.clone()).start();
        registry.register("slot0@yard.test", slot0.recipient());
        let slot1 = SlotManager::new("1", "slot1@yard.test", 2, df_endpoint, registry.clone(), content.clone()).start();
        registry.register("slot1@yard.test", slot1.recipient());

        // Let both slot managers finish registering with the DF.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let container = ContainerAgent::new("a", "a@yard.test", 1_000_000_030, df_endpoint, registry.clone(), content.clone()).start();
        registry.register("a@yard.test", container.recipient());

        // Let the allocation round (search -> CFP -> PROPOSE -> ACCEPT ->
        // INFORM) finish end to end.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let placed_slot = container.send(ProbeSlotId).await.expect("container agent alive");
        assert!(placed_slot == Some("0".to_string()) || placed_slot == Some("1".to_string()));

        let height0 = slot0.send(ProbeStackHeight).await.expect("slot0 alive");
        let height1 = slot1.send(ProbeStackHeight).await.expect("slot1 alive");
        assert_eq!(height0 + height1, 1, "exactly one slot holds the container");

        let winner_height = if placed_slot.as_deref() == Some("0") { height0 } else { height1 };
        assert_eq!(winner_height, 1);
    }
}
