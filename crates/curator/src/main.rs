//! Papershelf Curator
//!
//! Imports a seed file into a fresh catalog and prints a JSON report.
//! Handles:
//! - Configuration and logging setup
//! - Seed import through the catalog workflow (validation, inference)
//! - Optional bulk approval of everything imported

mod report;
mod seed;

use anyhow::Context;
use papershelf_common::{
    config::{AppConfig, ObservabilityConfig},
    db::models::UserId,
    forms::UserForm,
    metrics, CatalogService, Repository,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting Papershelf curator v{}",
        papershelf_common::VERSION
    );

    // Initialize metrics
    metrics::register_metrics();

    let path = std::env::args()
        .nth(1)
        .or_else(|| config.curator.seed_path.clone())
        .context("No seed file given (pass a path or set APP__CURATOR__SEED_PATH)")?;
    let raw = std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
    let seed: seed::Seed =
        serde_json::from_str(&raw).with_context(|| format!("Malformed seed file {}", path))?;

    let mut service = CatalogService::new(Repository::default(), &config.doi);
    let actor = acting_user(&mut service, &config.curator.acting_user)?;

    let summary = seed::import(&mut service, seed, actor);

    if config.curator.auto_approve {
        let categories = service.approve_categories(&summary.categories, actor);
        let tags = service.approve_tags(&summary.tags, actor);
        let papers = service.approve_papers(&summary.papers, actor);
        info!(categories, tags, papers, "Imported entries approved");
    }

    let report = report::Report::build(&service, summary);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Install the global subscriber. Output goes to stderr so stdout carries
/// only the report.
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Find or create the staff user the import acts as
fn acting_user(service: &mut CatalogService, username: &str) -> anyhow::Result<UserId> {
    if let Some(user) = service.repository().find_user_by_username(username) {
        return Ok(user.id);
    }

    let id = service
        .register_user(UserForm {
            username: username.to_string(),
            email: None,
            is_staff: true,
        })
        .with_context(|| format!("Invalid acting user {:?}", username))?;
    Ok(id)
}
