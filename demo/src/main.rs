//! Custos CMS Reference Runtime: Demo CLI
//!
//! Runs one or all of the three CMS ownership scenarios, or prints the
//! permissions a policy file defines.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- document-lifecycle
//!   cargo run -p demo -- ownership-fallback
//!   cargo run -p demo -- principal-deletion
//!   cargo run -p demo -- permissions --policy crates/custos-ref-cms/policies/cms.toml

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use custos_contracts::error::CustosResult;
use custos_contracts::permission::PermissionKey;
use custos_policy::AuthzPolicy;
use custos_ref_cms::scenarios::{document_lifecycle, ownership_fallback, principal_deletion};
use custos_ref_cms::{CmsHost, CMS_POLICY};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Custos: ownership-aware authorization, CMS demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Custos CMS reference runtime demo",
    long_about = "Runs Custos CMS demo scenarios showing global and personal permissions,\n\
                  ownership fallback, principal deletion guards, and the decision audit chain."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three CMS scenarios in sequence.
    RunAll,
    /// Scenario 1: Document Lifecycle (global vs personal permissions).
    DocumentLifecycle,
    /// Scenario 2: Ownership Fallback (dangling authors reassigned).
    OwnershipFallback,
    /// Scenario 3: Principal Deletion (blocked while owning entities).
    PrincipalDeletion,
    /// Register a policy's models and list the permissions they define.
    Permissions {
        /// Policy TOML file. Defaults to the bundled CMS policy.
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Reject personal actions on models without an owner field.
        #[arg(long)]
        strict: bool,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug to follow every permission check.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::DocumentLifecycle => document_lifecycle::run_scenario(),
        Command::OwnershipFallback => ownership_fallback::run_scenario(),
        Command::PrincipalDeletion => principal_deletion::run_scenario(),
        Command::Permissions { policy, strict } => list_permissions(policy, strict),
    };

    match result {
        Ok(()) => {
            println!("All selected commands completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

fn run_all() -> CustosResult<()> {
    document_lifecycle::run_scenario()?;
    ownership_fallback::run_scenario()?;
    principal_deletion::run_scenario()?;
    Ok(())
}

fn list_permissions(path: Option<PathBuf>, strict: bool) -> CustosResult<()> {
    let mut policy = match &path {
        Some(path) => {
            debug!(path = %path.display(), "loading policy file");
            AuthzPolicy::from_file(path)?
        }
        None => AuthzPolicy::from_toml_str(CMS_POLICY)?,
    };
    if strict {
        policy.registry.strict_ownership_registration = true;
    }

    println!(
        "=== Permissions ({}) ===",
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "bundled cms.toml".to_string())
    );
    println!(
        "  namespace: {}   strict ownership registration: {}",
        policy.registry.namespace, policy.registry.strict_ownership_registration
    );
    println!();

    let host = CmsHost::from_policy(policy)?;

    for model in &host.policy().models {
        let owner = model.owner_field().unwrap_or("-");
        println!(
            "  model '{}'  package {}  group '{}'  owner field {}",
            model.name,
            model.package,
            model.permission_group(),
            owner
        );
        let keys = host.registry().permission_keys(&model.name);
        if keys.is_empty() {
            println!("    (no permissions defined)");
        }
        for key in keys {
            let name = key.to_string();
            let description = host
                .permissions()
                .get(&name)
                .map(|d| d.description)
                .unwrap_or_default();
            let scope = if key.personal { "personal" } else { "global" };
            println!("    {:<28} {:<9} {}", name, scope, description);
        }
        println!();
    }

    println!("  Principals:");
    for principal in host.principals().list() {
        let roles: Vec<String> = principal.roles.iter().map(|r| format!("{:?}", r)).collect();
        let grants: Vec<String> = principal
            .permissions
            .iter()
            .map(|grant| describe_grant(grant, host.registry().namespace()))
            .collect();
        println!("    {:<6} {:<8} [{}]", principal.login, roles.join(","), grants.join(", "));
    }
    println!();

    Ok(())
}

/// Label a granted permission name with its scope. Names that do not parse,
/// or that belong to another namespace, are flagged since no check matches them.
fn describe_grant(grant: &str, namespace: &str) -> String {
    match grant.parse::<PermissionKey>() {
        Ok(key) if key.namespace != namespace => format!("{} (foreign namespace)", grant),
        Ok(key) if key.personal => format!("{} (personal)", grant),
        Ok(_) => grant.to_string(),
        Err(_) => format!("{} (malformed)", grant),
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Custos: Ownership-aware Authorization");
    println!("CMS Reference Demo");
    println!("======================================");
    println!();
    println!("Decision procedure per check:");
    println!("  [1] Admin, developer, and system principals are allowed outright");
    println!("  [2] Global permission   <ns>@<action>.<model>      → allowed on every entity");
    println!("  [3] Personal permission <ns>@<action>_own.<model>  → allowed if the stored owner matches");
    println!("  [4] Dangling owners are reassigned to the first admin before comparing");
    println!("  [5] Every guard decision is appended to a SHA-256 audit chain");
    println!();
}
