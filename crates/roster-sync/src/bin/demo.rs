//! # Reorder Demo
//!
//! Drives both edit surfaces against the in-memory gateway and prints the
//! list view after each step.
//!
//! ## Usage
//! ```bash
//! # Direct reorder, then an edit-order session
//! cargo run -p roster-sync --bin demo
//!
//! # Make the direct reorder fail remotely to watch the rollback
//! cargo run -p roster-sync --bin demo -- --fail conflict
//!
//! # Use a specific config file
//! cargo run -p roster-sync --bin demo -- --config ./roster.toml
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use roster_sync::{
    ClientType, Coordinator, Direction, GatewayFailure, InMemoryGateway, ListView,
    RecordingEmitter, ReorderEngine, RosterConfig,
};
use tracing_subscriber::EnvFilter;

/// Client types the demo collection starts with.
const SEED: &[(&str, &str)] = &[
    ("retail", "Retail"),
    ("wholesale", "Wholesale"),
    ("distributor", "Distributor"),
    ("corporate", "Corporate"),
    ("partner", "Partner"),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,roster=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn seed_records() -> Vec<ClientType> {
    SEED.iter()
        .zip(0u32..)
        .map(|(&(id, name), position)| {
            let record = ClientType::new(name)
                .with_id(id)
                .with_position(position)
                .with_description(format!("{name} customers"));
            if position == 0 {
                record.as_default()
            } else {
                record
            }
        })
        .collect()
}

fn parse_failure(value: &str) -> Option<GatewayFailure> {
    match value {
        "transient" => Some(GatewayFailure::Transient),
        "conflict" => Some(GatewayFailure::Conflict),
        "auth" => Some(GatewayFailure::Auth),
        _ => None,
    }
}

fn print_view(step: &str, view: &ListView) -> Result<(), Box<dyn std::error::Error>> {
    let order: Vec<&str> = view.records.iter().map(|r| r.name.as_str()).collect();
    println!("── {step}");
    println!("   mode={} reordering={} order={:?}", view.mode, view.is_reordering, order);
    println!("   {}", serde_json::to_string(view)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut failure: Option<GatewayFailure> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--fail" | "-f" => {
                if i + 1 < args.len() {
                    failure = parse_failure(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Roster Reorder Demo");
                println!();
                println!("Usage: demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -f, --fail <KIND>     Fail the direct reorder: transient | conflict | auth");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = RosterConfig::load_or_default(config_path);
    let gateway = Arc::new(InMemoryGateway::new(seed_records()));
    let engine = Arc::new(ReorderEngine::new(gateway.clone(), &config));
    let events = Arc::new(RecordingEmitter::new());
    engine.subscribe(events.clone());

    engine.refresh().await?;
    let coordinator = Coordinator::new(engine.clone());
    print_view("loaded", &coordinator.view())?;

    // Direct surface: drag "Partner" to the top.
    if let Some(kind) = failure {
        gateway.fail_next_persist(kind);
    }
    match coordinator.reorder("partner", 4, 0).await {
        Ok(outcome) => println!(
            "   persisted {} position change(s)",
            outcome.patch().map_or(0, |p| p.len())
        ),
        Err(e) => println!("   reorder failed: {e}"),
    }
    print_view("after drag", &coordinator.view())?;

    // Draft surface: step "Retail" down twice, then commit once.
    coordinator.enter_draft_mode()?;
    coordinator.move_draft("retail", Direction::Down)?;
    coordinator.move_draft("retail", Direction::Down)?;
    print_view("draft", &coordinator.view())?;

    let outcome = coordinator.commit_draft().await?;
    println!(
        "   committed {} position change(s)",
        outcome.patch().map_or(0, |p| p.len())
    );
    print_view("after commit", &coordinator.view())?;

    if let Some(default) = engine.default_record() {
        println!("Default client type: {}", default.name);
    }
    println!(
        "Gateway received {} persist call(s); {} failure notification(s)",
        gateway.persist_count(),
        events.failures().len()
    );

    Ok(())
}
