//! Replay command implementation.

use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toposync_core::{ConfigError, NodeReconciler, ReconcilerConfig, SyncGate, WatchEvent};
use toposync_store::{EndpointRecord, NodeRecord, Store, StoreError, Table};
use tracing::info;

/// Arguments of the replay command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON-lines file of node watch events
    #[arg(short, long)]
    pub events: PathBuf,

    /// JSON array of endpoint records to seed the store with
    #[arg(long)]
    pub endpoints: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Reconciler flags, read once at startup.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Node name override
    #[arg(long)]
    pub node_name: Option<String>,

    /// Node labels to include (comma-separated globs)
    #[arg(long = "with-node-labels", default_value = "")]
    pub with_node_labels: String,

    /// Node annotations to include (comma-separated globs)
    #[arg(long = "with-node-annotations", default_value = "")]
    pub with_node_annotations: String,

    /// Endpoint slices manage endpoint topology; node events leave endpoints alone
    #[arg(long)]
    pub manage_endpoint_slices: bool,
}

impl ConfigArgs {
    /// Validates the flags into a reconciler configuration.
    pub fn to_config(&self) -> Result<ReconcilerConfig, ConfigError> {
        ReconcilerConfig::builder()
            .node_name(self.node_name.clone().unwrap_or_default())
            .label_patterns(&self.with_node_labels)
            .annotation_patterns(&self.with_node_annotations)
            .manage_endpoint_slices(self.manage_endpoint_slices)
            .build()
    }
}

/// Replay result.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Local node identity.
    pub local_node: String,
    /// Number of events applied.
    pub events: usize,
    /// Revision of each table.
    pub revisions: BTreeMap<Table, u64>,
    /// Whether the nodes table is flagged as synced.
    pub nodes_synced: bool,
    /// Node records, by name.
    pub nodes: Vec<NodeRecord>,
    /// Endpoint records, by key.
    pub endpoints: Vec<EndpointRecord>,
}

/// Runs the replay command.
pub fn run(args: &ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let report = replay(args)?;

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

/// Replays the event log and returns the resulting store contents.
///
/// Stops at the first malformed or non-node event.
pub fn replay(args: &ReplayArgs) -> Result<ReplayReport, Box<dyn std::error::Error>> {
    let config = Arc::new(args.config.to_config()?);
    let store = Arc::new(Store::new());

    if let Some(path) = &args.endpoints {
        let endpoints = load_endpoints(path)?;
        info!(count = endpoints.len(), "seeding endpoints");
        store.update(|tx| {
            for ep in endpoints {
                tx.set_endpoint(ep)?;
            }
            Ok::<_, StoreError>(())
        })?;
    }

    // The log is a complete listing.
    let reconciler =
        NodeReconciler::new(Arc::clone(&store), Arc::clone(&config), SyncGate::synced());

    let file = File::open(&args.events)
        .map_err(|e| format!("cannot open {}: {e}", args.events.display()))?;
    let mut applied = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let location = format!("{}:{}", args.events.display(), index + 1);
        let event: WatchEvent = serde_json::from_str(&line)
            .map_err(|e| format!("{location}: malformed event: {e}"))?;
        reconciler
            .dispatch(event)
            .map_err(|e| format!("{location}: {e}"))?;
        applied += 1;
    }
    info!(events = applied, "replay complete");

    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
    let snapshot = store.snapshot();
    Ok(ReplayReport {
        local_node: config.effective_node_name(&hostname).to_string(),
        events: applied,
        revisions: Table::ALL
            .iter()
            .map(|&t| (t, snapshot.revision(t).as_u64()))
            .collect(),
        nodes_synced: snapshot.is_synced(Table::Nodes),
        nodes: snapshot.nodes().cloned().collect(),
        endpoints: snapshot.endpoints().cloned().collect(),
    })
}

fn load_endpoints(path: &Path) -> Result<Vec<EndpointRecord>, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let endpoints = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("{}: invalid endpoints: {e}", path.display()))?;
    Ok(endpoints)
}

fn print_text_output(report: &ReplayReport) {
    println!("toposync replay");
    println!("===============");
    println!();
    println!("Local node: {}", report.local_node);
    println!("Events:     {}", report.events);
    println!();
    println!("Revisions:");
    for (table, rev) in &report.revisions {
        println!("  {:<10} {}", table.name(), rev);
    }
    println!("  nodes synced: {}", report.nodes_synced);
    println!();
    println!("Nodes:");
    for node in &report.nodes {
        println!("  {}", node.name);
        println!("    labels:      {}", format_attributes(&node.labels));
        println!("    annotations: {}", format_attributes(&node.annotations));
    }
    println!();
    println!("Endpoints:");
    for ep in &report.endpoints {
        let node = if ep.node_name.is_empty() {
            "-"
        } else {
            ep.node_name.as_str()
        };
        println!(
            "  {}/{}/{} on {}: {}",
            ep.namespace,
            ep.service_name,
            ep.key,
            node,
            format_attributes(&ep.topology)
        );
    }
}

fn format_attributes(attrs: &toposync_store::Attributes) -> String {
    if attrs.is_empty() {
        return "{}".to_string();
    }
    let pairs: Vec<String> = attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{{{}}}", pairs.join(", "))
}
