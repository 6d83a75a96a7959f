// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ptrsync::{
    config::EngineConfig,
    engine::DnsEngine,
    import::{ImportDocument, ImportReport},
    ipam::IpamAddress,
    metrics::gather_metrics,
    model::RecordDetail,
    rfc2317::{compute_delegation, Rfc2317Delegation, Rfc2317Naming},
};
use serde::Serialize;
use tracing::{debug, info};

/// DNS forward/reverse record synchronization.
#[derive(Parser)]
#[command(name = "ptrsync", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import zones, records and IPAM addresses and print the synchronized records.
    Import(ImportArgs),

    /// Print the RFC 2317 delegation names for an address in a sub-/24 network.
    Delegation(DelegationArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// YAML or JSON import document.
    file: PathBuf,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// RFC 2317 child zone naming (hyphenated or cidr).
    #[arg(long)]
    rfc2317_naming: Option<Rfc2317Naming>,

    /// Print Prometheus metrics to stderr after the import.
    #[arg(long)]
    metrics: bool,
}

#[derive(Args)]
struct DelegationArgs {
    /// Delegated network, e.g. 192.0.2.0/28.
    network: String,

    /// Address to compute the alias for (defaults to the network address).
    #[arg(long)]
    address: Option<Ipv4Addr>,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// RFC 2317 child zone naming (hyphenated or cidr).
    #[arg(long)]
    rfc2317_naming: Option<Rfc2317Naming>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct ImportOutput {
    report: ImportReport,
    records: Vec<RecordOutput>,
}

#[derive(Serialize)]
struct RecordOutput {
    #[serde(flatten)]
    detail: RecordDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    ipam_address: Option<IpamAddress>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("ptrsync")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json|text.
    // Logs go to stderr so that stdout only carries command output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
    debug!("Logging initialized with file and line number tracking");

    match cli.command {
        Command::Import(args) => run_import(args).await,
        Command::Delegation(args) => run_delegation(&args),
    }
}

fn engine_config(naming: Option<Rfc2317Naming>) -> EngineConfig {
    let config = EngineConfig::from_env();
    match naming {
        Some(naming) => config.with_rfc2317_naming(naming),
        None => config,
    }
}

async fn run_import(args: ImportArgs) -> Result<()> {
    info!(file = %args.file.display(), "Importing document");
    let document = ImportDocument::load(&args.file).await?;
    let engine = DnsEngine::new(engine_config(args.rfc2317_naming)).with_ipam(document.ipam_source());

    let report = document.apply(&engine).await;
    let stored = engine.records().await;
    let addresses = engine.ipam_addresses(&stored).await;
    let mut records = Vec::with_capacity(stored.len());
    for (record, ipam_address) in stored.iter().zip(addresses) {
        if let Some(detail) = engine.record_detail(record.id).await {
            records.push(RecordOutput {
                detail,
                ipam_address,
            });
        }
    }
    let output = ImportOutput { report, records };

    match args.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialize import result")?
        ),
        OutputFormat::Text => print!("{}", render_import(&output)),
    }
    if args.metrics {
        eprint!("{}", gather_metrics().context("Failed to gather metrics")?);
    }

    if !output.report.is_clean() {
        bail!("{} import item(s) failed", output.report.failures.len());
    }
    Ok(())
}

fn render_import(output: &ImportOutput) -> String {
    let report = &output.report;
    let mut text = String::new();
    let _ = writeln!(
        text,
        "Imported {} zone(s) and {} record(s)",
        report.zones_created, report.records_created
    );

    for entry in &output.records {
        let detail = &entry.detail;
        let record = &detail.record;
        let ttl = record.ttl.map(|ttl| ttl.to_string()).unwrap_or_default();
        let _ = write!(
            text,
            "{:>5}  {:<40} {:>6} {:<5} {}",
            record.id, detail.fqdn, ttl, record.record_type, record.value
        );
        if record.managed() {
            text.push_str("  [managed]");
        }
        if let Some(ptr) = detail.ptr_record {
            let _ = write!(text, "  ptr={ptr}");
        }
        if let Some(address) = detail.address_record {
            let _ = write!(text, "  address={address}");
        }
        if let Some(alias) = detail.rfc2317_cname_record {
            let _ = write!(text, "  alias={alias}");
        }
        if !detail.rfc2317_ptr_records.is_empty() {
            let ids: Vec<String> = detail.rfc2317_ptr_records.iter().map(ToString::to_string).collect();
            let _ = write!(text, "  serves={}", ids.join(","));
        }
        if let Some(address) = &entry.ipam_address {
            let _ = write!(text, "  ipam={}", address.address);
        }
        text.push('\n');
    }

    for warning in &report.warnings {
        let _ = writeln!(text, "warning: {warning}");
    }
    for failure in &report.failures {
        let _ = writeln!(text, "error: {}: {}", failure.item, failure.message);
    }
    text
}

fn run_delegation(args: &DelegationArgs) -> Result<()> {
    let (network, prefix_len) = args
        .network
        .split_once('/')
        .context("Network must be given as ADDRESS/LENGTH")?;
    let network: Ipv4Addr = network
        .trim()
        .parse()
        .with_context(|| format!("Invalid IPv4 network address '{network}'"))?;
    let prefix_len: u8 = prefix_len
        .trim()
        .parse()
        .with_context(|| format!("Invalid prefix length '{prefix_len}'"))?;
    let address = args.address.unwrap_or(network);

    let naming = engine_config(args.rfc2317_naming).rfc2317_naming;
    let Some(delegation) = compute_delegation(address, prefix_len, naming) else {
        bail!("No classless delegation for {address}/{prefix_len}: prefix must be 25-32");
    };
    if !delegation.prefix.contains(network) {
        bail!("Address {address} is not inside {}", args.network);
    }

    match args.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&delegation).context("Failed to serialize delegation")?
        ),
        OutputFormat::Text => print!("{}", render_delegation(&delegation)),
    }
    Ok(())
}

fn render_delegation(delegation: &Rfc2317Delegation) -> String {
    format!(
        "prefix:      {}\nparent zone: {}\nchild zone:  {}\nalias:       {}.{}. CNAME {}\n",
        delegation.prefix,
        delegation.parent_zone_name,
        delegation.child_zone_name,
        delegation.alias_name,
        delegation.parent_zone_name,
        delegation.alias_target,
    )
}
