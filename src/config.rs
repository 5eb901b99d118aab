// config.rs - deployment configuration (§6 CLI surface)
//
//! `YardConfig` is populated by the CLI binary from `--domain`,
//! `--slot-count`, `--max-slot-height`, `--container-count`, and the
//! workload-tuning flags, then layered over file/env defaults via the
//! `config` crate the way ambient services in this codebase load settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YardConfig {
    /// Transport domain suffix for generated endpoints, e.g. `yard.local`.
    pub domain: String,

    /// Number of slot managers to start.
    pub slot_count: u32,

    /// Maximum stack height `H` shared by every slot in this deployment.
    pub max_slot_height: u32,

    /// Number of containers the workload generator produces.
    pub container_count: u32,

    /// Seconds between a container's arrival and its truck's next arrival.
    pub arrival_delta_secs: i64,

    /// Seconds between arrival and scheduled departure for a container.
    pub departure_delta_secs: i64,

    /// Containers per truck batch.
    pub batch_size: u32,

    /// Fractional jitter applied to each departure estimate (0.0 = exact).
    pub estimated_departure_accuracy: f64,
}

impl Default for YardConfig {
    fn default() -> Self {
        Self {
            domain: "yard.local".to_string(),
            slot_count: 2,
            max_slot_height: 3,
            container_count: 3,
            arrival_delta_secs: 5,
            departure_delta_secs: 30,
            batch_size: 1,
            estimated_departure_accuracy: 0.0,
        }
    }
}

impl YardConfig {
    /// Layer environment variables (`STACKYARD_*`) over the built-in
    /// defaults; `overrides` (typically CLI flags already parsed by clap)
    /// always wins, but only for the fields actually set — an absent flag
    /// must not mask an environment variable with the built-in default.
    pub fn load(overrides: YardConfigOverrides) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&YardConfig::default())?;
        let layered = config::Config::builder()
            .add_source(defaults)
            .add_source(config::Environment::with_prefix("STACKYARD"))
            .add_source(config::Config::try_from(&overrides)?)
            .build()?;
        layered.try_deserialize()
    }

    pub fn slot_endpoint(&self, index: u32) -> String {
        format!("slot{}@{}", index, self.domain)
    }

    pub fn container_endpoint(&self, id: &str) -> String {
        format!("{}@{}", id, self.domain)
    }

    pub fn df_endpoint(&self) -> String {
        format!("df@{}", self.domain)
    }

    pub fn port_manager_endpoint(&self) -> String {
        format!("port-manager@{}", self.domain)
    }
}

/// CLI-flag-shaped overlay for `YardConfig::load`: every field absent
/// (`None`) is skipped when serializing into a config source, so an unset
/// flag never shadows a `STACKYARD_*` environment variable with the
/// built-in default the way a fully-populated `YardConfig` would.
#[derive(Debug, Clone, Default, Serialize)]
pub struct YardConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_slot_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_delta_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_delta_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_departure_accuracy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_derives_well_known_endpoints() {
        let config = YardConfig::default();
        assert_eq!(config.slot_endpoint(0), "slot0@yard.local");
        assert_eq!(config.df_endpoint(), "df@yard.local");
    }

    #[test]
    fn load_with_no_overrides_yields_built_in_defaults() {
        let config = YardConfig::load(YardConfigOverrides::default()).unwrap();
        assert_eq!(config.slot_count, YardConfig::default().slot_count);
        assert_eq!(config.domain, YardConfig::default().domain);
    }

    #[test]
    fn load_applies_only_the_overrides_that_are_set() {
        let overrides = YardConfigOverrides { slot_count: Some(9), ..Default::default() };
        let config = YardConfig::load(overrides).unwrap();
        assert_eq!(config.slot_count, 9);
        assert_eq!(config.domain, YardConfig::default().domain);
    }
}
