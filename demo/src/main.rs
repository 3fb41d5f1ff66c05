//! Capability menu engine demo CLI
//!
//! Resolves menus and assignable access for a subject described on the
//! command line, using the shipped reference catalog.
//!
//! Usage:
//!   cargo run -p demo -- menu --sector "Барбершоп" --tier "Премиум" --user can_view_barber_clients
//!   cargo run -p demo -- assignable --sector "Магазин" --tier "Прайм" --user can_view_cashier --org can_view_branch=true
//!   cargo run -p demo -- encode --labels "Касса,Склад" --sector "Склад" --user can_view_cashbox
//!   cargo run -p demo -- decode --map '{"can_view_cashbox":true}' --sector "Склад" --user can_view_cashbox
//!   cargo run -p demo -- validate --catalog my_catalog.toml

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use capmenu_catalog::engine_from_files;
use capmenu_contracts::{
    capability::CapabilityId,
    context::{SubjectContext, Tier},
    error::{CapMenuError, CapMenuResult},
};
use capmenu_core::{codec, MenuEngine};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Resolve sidebar menus and assignable access for one subject.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Capability menu engine demo",
    long_about = "Resolves the sidebar menu, the assignable access set and the persisted\n\
                  access map for a subject built from command-line flags."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved menu tree as JSON.
    Menu(ContextArgs),
    /// Print what the subject may assign to others, grouped by scope.
    Assignable(ContextArgs),
    /// Turn a comma-separated label list into the persisted access map.
    Encode {
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
        #[command(flatten)]
        ctx: ContextArgs,
    },
    /// Turn a persisted access map (JSON object) into its label list.
    Decode {
        #[arg(long)]
        map: String,
        #[command(flatten)]
        ctx: ContextArgs,
    },
    /// Load and cross-check configuration, falling back to the shipped files.
    Validate {
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

/// Flags describing the subject.
#[derive(Args)]
struct ContextArgs {
    /// Sector display name, e.g. "Магазин".
    #[arg(long, default_value = "")]
    sector: String,
    /// Subscription tier name. Defaults to the Start tier.
    #[arg(long)]
    tier: Option<String>,
    /// User grant, `id` or `id=true|false`. Repeatable.
    #[arg(long = "user", value_parser = parse_user_flag)]
    user: Vec<(String, bool)>,
    /// Organization grant, `id=true|false`. Repeatable.
    #[arg(long = "org", value_parser = parse_org_flag)]
    org: Vec<(String, bool)>,
    /// Profile role, e.g. "owner".
    #[arg(long)]
    role: Option<String>,
    /// Branch membership id. Repeatable.
    #[arg(long = "branch")]
    branches: Vec<String>,
}

fn parse_user_flag(s: &str) -> Result<(String, bool), String> {
    match s.split_once('=') {
        Some((id, flag)) => Ok((id.to_string(), parse_bool(flag)?)),
        None => Ok((s.to_string(), true)),
    }
}

fn parse_org_flag(s: &str) -> Result<(String, bool), String> {
    let (id, flag) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <id>=true|false, got '{s}'"))?;
    Ok((id.to_string(), parse_bool(flag)?))
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Menu(ctx) => run_menu(&ctx),
        Command::Assignable(ctx) => run_assignable(&ctx),
        Command::Encode { labels, ctx } => run_encode(&labels, &ctx),
        Command::Decode { map, ctx } => run_decode(&map, &ctx),
        Command::Validate {
            catalog,
            rules,
            policy,
        } => run_validate(catalog, rules, policy),
    };

    match result {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_menu(args: &ContextArgs) -> CapMenuResult<String> {
    let engine = engine_from_files(None, None, None)?;
    let ctx = build_context(&engine, args)?;
    let menu = engine.resolve_menu(&ctx);
    debug!(fingerprint = %engine.fingerprint(&ctx), entries = menu.len(), "menu printed");
    to_pretty(&menu)
}

fn run_assignable(args: &ContextArgs) -> CapMenuResult<String> {
    let engine = engine_from_files(None, None, None)?;
    let ctx = build_context(&engine, args)?;
    let assignable = engine.resolve_assignable(&ctx);

    let mut grouped = serde_json::Map::new();
    for (scope, entries) in assignable.grouped() {
        let list: Vec<Value> = entries
            .iter()
            .map(|e| json!({ "id": e.id, "label": e.label }))
            .collect();
        grouped.insert(scope.to_string(), Value::Array(list));
    }
    to_pretty(&Value::Object(grouped))
}

fn run_encode(labels: &[String], args: &ContextArgs) -> CapMenuResult<String> {
    let engine = engine_from_files(None, None, None)?;
    let ctx = build_context(&engine, args)?;
    let assignable = engine.resolve_assignable(&ctx);

    let trimmed: Vec<&str> = labels.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    let map = codec::to_map(trimmed.as_slice(), &assignable);
    to_pretty(&map.to_patch_body())
}

fn run_decode(raw: &str, args: &ContextArgs) -> CapMenuResult<String> {
    let engine = engine_from_files(None, None, None)?;
    let ctx = build_context(&engine, args)?;
    let assignable = engine.resolve_assignable(&ctx);

    let body: Value = serde_json::from_str(raw).map_err(|e| CapMenuError::ConfigError {
        reason: format!("failed to parse access map JSON: {}", e),
    })?;
    let object = body.as_object().ok_or_else(|| CapMenuError::ConfigError {
        reason: "access map must be a JSON object".to_string(),
    })?;
    for key in object.keys() {
        require_known(&engine, key)?;
    }

    let map = codec::from_patch_body(&body, &assignable);
    to_pretty(&codec::to_labels(&map, &assignable))
}

fn run_validate(
    catalog: Option<PathBuf>,
    rules: Option<PathBuf>,
    policy: Option<PathBuf>,
) -> CapMenuResult<String> {
    let engine = engine_from_files(catalog.as_deref(), rules.as_deref(), policy.as_deref())?;
    let catalog = engine.catalog();
    to_pretty(&json!({
        "status": "ok",
        "version": catalog.version(),
        "capabilities": catalog.capabilities().count(),
        "baseline": catalog.baseline().len(),
        "sectors": catalog.sector_keys().collect::<Vec<_>>(),
        "additional_services": catalog.additional().len(),
    }))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn build_context(engine: &MenuEngine, args: &ContextArgs) -> CapMenuResult<SubjectContext> {
    let tier = args
        .tier
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(Tier::new)
        .unwrap_or_default();

    let mut ctx = SubjectContext::new(args.sector.clone(), tier).with_branches(args.branches.clone());
    if let Some(role) = &args.role {
        ctx = ctx.with_role(role.clone());
    }
    for (id, flag) in &args.user {
        require_known(engine, id)?;
        ctx = ctx.with_user_grant(id.clone(), *flag);
    }
    for (id, flag) in &args.org {
        require_known(engine, id)?;
        ctx = ctx.with_org_grant(id.clone(), *flag);
    }
    Ok(ctx)
}

fn require_known(engine: &MenuEngine, id: &str) -> CapMenuResult<()> {
    if engine.catalog().contains(&CapabilityId::new(id)) {
        Ok(())
    } else {
        Err(CapMenuError::UnknownCapability {
            capability: id.to_string(),
        })
    }
}

fn to_pretty<T: serde::Serialize + ?Sized>(value: &T) -> CapMenuResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CapMenuError::ConfigError {
        reason: format!("failed to render JSON output: {}", e),
    })
}
