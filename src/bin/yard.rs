// bin/yard.rs - stacking yard launcher and workload generator
//
//! Starts the Directory Facilitator, one slot manager per configured slot,
//! and a Port Manager, then drives a synthetic workload: containers arrive
//! on a staggered schedule and run the allocation initiator on start;
//! batches of them later depart via a Truck's `containers-deallocation-
//! request` to the Port Manager (§4.6), exercising the externally-triggered
//! self-deallocation path alongside each container's own departure timer
//! (§4.5).

use actix::prelude::*;
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

use stackyard::config::{YardConfig, YardConfigOverrides};
use stackyard::content::ContentManager;
use stackyard::observability::{init_tracing, TracingConfig, TracingFormat};
use stackyard::platform::DirectoryFacilitator;
use stackyard::yard::{ContainerAgent, PortManager, SlotManager, Truck};
use stackyard::ActorRegistry;

/// Stacking yard simulator
#[derive(Parser, Debug)]
#[command(name = "stackyard")]
#[command(author = "SavageS")]
#[command(version)]
#[command(about = "Seaport container-stacking yard multi-agent simulator", long_about = None)]
struct Args {
    /// Transport domain suffix for generated endpoints
    #[arg(long)]
    domain: Option<String>,

    /// Number of slot managers to start
    #[arg(long)]
    slot_count: Option<u32>,

    /// Maximum stack height shared by every slot
    #[arg(long)]
    max_slot_height: Option<u32>,

    /// Number of containers the workload generator produces
    #[arg(long)]
    container_count: Option<u32>,

    /// Seconds between successive container arrivals
    #[arg(long)]
    arrival_delta_secs: Option<i64>,

    /// Seconds between a container's arrival and its scheduled departure
    #[arg(long)]
    departure_delta_secs: Option<i64>,

    /// Containers per truck batch
    #[arg(long)]
    batch_size: Option<u32>,

    /// Fractional jitter applied to each departure estimate (0.0 = exact)
    #[arg(long)]
    estimated_departure_accuracy: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,
}

impl Args {
    fn into_overrides(self) -> YardConfigOverrides {
        YardConfigOverrides {
            domain: self.domain,
            slot_count: self.slot_count,
            max_slot_height: self.max_slot_height,
            container_count: self.container_count,
            arrival_delta_secs: self.arrival_delta_secs,
            departure_delta_secs: self.departure_delta_secs,
            batch_size: self.batch_size,
            estimated_departure_accuracy: self.estimated_departure_accuracy,
        }
    }
}

fn now_epoch_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("clock before epoch").as_secs() as i64
}

/// Deterministic wobble around `departure_delta_secs`, scaled down as
/// `accuracy` approaches 1.0. No RNG in the dependency stack, so the
/// wobble cycles through `{-1, 0, +1}` by container index.
fn jittered_departure(base: i64, accuracy: f64, index: u32) -> i64 {
    let spread = (base as f64 * (1.0 - accuracy.clamp(0.0, 1.0))).round() as i64;
    let sign = match index % 3 {
        0 => -1,
        1 => 0,
        _ => 1,
    };
    base + sign * spread
}

#[actix::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let tracing_config = TracingConfig {
        filter: format!("{},stackyard={}", args.log_level, args.log_level),
        format: match args.log_format.as_str() {
            "json" => TracingFormat::Json,
            "compact" => TracingFormat::Compact,
            _ => TracingFormat::Pretty,
        },
        with_span_events: args.log_level == "trace" || args.log_level == "debug",
        with_file: args.log_level == "debug" || args.log_level == "trace",
        with_target: true,
        with_thread_ids: args.log_level == "trace",
        with_thread_names: false,
        with_ansi: args.log_format != "json",
    };
    let log_level = args.log_level.clone();
    init_tracing(tracing_config);

    let config = YardConfig::load(args.into_overrides())?;
    info!(?config, "starting stackyard");

    let registry = ActorRegistry::new();
    let content = Arc::new(ContentManager::new());

    let df_endpoint = config.df_endpoint();
    let df = DirectoryFacilitator::new(df_endpoint.clone(), registry.clone(), content.clone()).start();
    registry.register(df_endpoint.clone(), df.recipient());

    for i in 0..config.slot_count {
        let endpoint = config.slot_endpoint(i);
        let slot = SlotManager::new(i.to_string(), endpoint.clone(), config.max_slot_height, df_endpoint.clone(), registry.clone(), content.clone()).start();
        registry.register(endpoint, slot.recipient());
    }

    let port_manager_endpoint = config.port_manager_endpoint();
    let port_manager = PortManager::new(port_manager_endpoint.clone(), registry.clone(), content.clone()).start();
    registry.register(port_manager_endpoint.clone(), port_manager.recipient());

    // Let slot managers finish registering with the DF before containers
    // start searching it.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut batch: Vec<String> = Vec::new();
    let mut batch_departure = i64::MIN;
    let mut truck_index = 0u32;

    for index in 0..config.container_count {
        let container_id = format!("c{index}");
        let endpoint = config.container_endpoint(&container_id);
        let departure_time = now_epoch_secs() + jittered_departure(config.departure_delta_secs, config.estimated_departure_accuracy, index);

        let container = ContainerAgent::new(container_id.clone(), endpoint.clone(), departure_time, df_endpoint.clone(), registry.clone(), content.clone()).start();
        registry.register(endpoint.clone(), container.recipient());
        info!(container = %container_id, departure_time, "container arrived");

        batch.push(endpoint);
        batch_departure = batch_departure.max(departure_time);

        if batch.len() as u32 >= config.batch_size || index + 1 == config.container_count {
            let truck_endpoint = format!("truck{truck_index}@{}", config.domain);
            truck_index += 1;
            let containers = std::mem::take(&mut batch);
            let wait = (batch_departure - now_epoch_secs()).max(0) as u64;
            let pm_endpoint = port_manager_endpoint.clone();
            let truck_registry = registry.clone();
            let truck_content = content.clone();
            actix_rt::spawn(async move {
                tokio::time::sleep(Duration::from_secs(wait)).await;
                Truck::new(truck_endpoint, pm_endpoint, containers, truck_registry, truck_content).start();
            });
            batch_departure = i64::MIN;
        }

        if index + 1 < config.container_count {
            tokio::time::sleep(Duration::from_secs(config.arrival_delta_secs.max(0) as u64)).await;
        }
    }

    // Give every scheduled departure and cascade time to finish before exit.
    let drain = config.departure_delta_secs.max(0) as u64 + 5;
    tokio::time::sleep(Duration::from_secs(drain)).await;

    info!(log_level = %log_level, "stackyard simulation complete");
    Ok(())
}
