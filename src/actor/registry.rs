// actor/registry.rs - in-process agent directory
//
//! Maps an endpoint (`localpart@domain`) to the `Recipient<Deliver>` that
//! reaches it. This is the single shared dependency every agent is
//! constructed with (§9 Singletons): a plain value behind an `Arc`, not a
//! global, and not an actor of its own, since it is never anything more
//! than a concurrent map.

use super::messages::Deliver;
use actix::prelude::*;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ActorRegistry {
    agents: Arc<DashMap<String, Recipient<Deliver>>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self { agents: Arc::new(DashMap::new()) }
    }

    pub fn register(&self, endpoint: impl Into<String>, recipient: Recipient<Deliver>) {
        self.agents.insert(endpoint.into(), recipient);
    }

    pub fn deregister(&self, endpoint: &str) {
        self.agents.remove(endpoint);
    }

    pub fn lookup(&self, endpoint: &str) -> Option<Recipient<Deliver>> {
        self.agents.get(endpoint).map(|r| r.clone())
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.agents.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_starts_empty_and_is_cheaply_clonable() {
        let registry = ActorRegistry::new();
        assert!(registry.endpoints().is_empty());
        let clone = registry.clone();
        registry.deregister("nonexistent@yard");
        assert!(clone.lookup("nonexistent@yard").is_none());
    }
}
