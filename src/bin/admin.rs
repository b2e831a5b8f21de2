//! CLI administration tool for the lookup table service.
//!
//! Generates API token digests, inspects the stored configuration, runs
//! lookups against it locally and checks the database, without going
//! through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Generate an API token and its digest for API_TOKEN_HASHES
//! cargo run --bin admin -- token generate
//!
//! # Inspect configuration
//! cargo run --bin admin -- tables list
//! cargo run --bin admin -- caches list --query geo
//! cargo run --bin admin -- types
//!
//! # Resolve a key through a table, with live instances built in this process
//! cargo run --bin admin -- query --table geoip --key 1.2.3.4
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (all commands except
//!   `token` and `types`)
//! - `TOKEN_SIGNING_SECRET`: HMAC key (`token generate`)

use lookup_tables::application::services::AuthService;
use lookup_tables::domain::entities::ComponentKind;
use lookup_tables::domain::repositories::{
    ComponentRepository, ListQuery, SortField, SortOrder, TableRepository,
};
use lookup_tables::infrastructure::persistence::{PgComponentRepository, PgTableRepository};
use lookup_tables::lookup::{LookupError, LookupKey, LookupResult, LookupService, Registries};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing the lookup table service.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage API tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Lookup tables
    Tables {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Caches
    Caches {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Data adapters
    Adapters {
        #[command(subcommand)]
        action: ListAction,
    },

    /// Show registered cache and data adapter types
    Types,

    /// Resolve a key through a lookup table
    Query {
        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        key: String,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Generate a random token and its digest
    Generate {
        /// Digest a given token instead of generating one
        #[arg(short, long)]
        token: Option<String>,

        /// Print only the digest
        #[arg(long)]
        digest_only: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ListAction {
    /// List stored records
    List {
        /// Case-insensitive search over name, title and description
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Token { action } => handle_token_action(action)?,
        Commands::Types => show_types(),
        Commands::Tables { action } => list_tables(&connect().await?, action).await?,
        Commands::Caches { action } => {
            list_components(&connect().await?, ComponentKind::Cache, action).await?
        }
        Commands::Adapters { action } => {
            list_components(&connect().await?, ComponentKind::DataAdapter, action).await?
        }
        Commands::Query { table, key } => run_query(&connect().await?, &table, &key).await?,
        Commands::Db { action } => handle_db_action(action, &connect().await?).await?,
    }

    Ok(())
}

async fn connect() -> Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")
}

fn handle_token_action(action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Generate {
            token,
            digest_only,
            yes,
        } => generate(token, digest_only, yes),
    }
}

/// Generates an API token and prints its digest.
///
/// # Flow
///
/// 1. Generate a random token or use the provided one
/// 2. Confirm (unless `--yes` or `--digest-only`)
/// 3. Digest it with HMAC-SHA256 keyed by `TOKEN_SIGNING_SECRET`
/// 4. Print the token once and the digest to append to `API_TOKEN_HASHES`
///
/// Nothing is stored; the raw token cannot be recovered from the digest.
fn generate(token: Option<String>, digest_only: bool, skip_confirm: bool) -> Result<()> {
    let secret =
        std::env::var("TOKEN_SIGNING_SECRET").context("TOKEN_SIGNING_SECRET must be set")?;
    if secret.is_empty() {
        anyhow::bail!("TOKEN_SIGNING_SECRET must not be empty");
    }

    let token_value = token.unwrap_or_else(generate_token);
    let digest = AuthService::digest(&secret, &token_value);

    if digest_only {
        println!("{digest}");
        return Ok(());
    }

    println!("{}", "🔑 Generate API Token".bright_blue().bold());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Print a new token to this terminal?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    println!("  Token:  {}", token_value.bright_yellow().bold());
    println!("  Digest: {}", digest.cyan());
    println!();
    println!(
        "{}",
        "⚠️  Save the token now. Only the digest goes into the server configuration."
            .red()
            .bold()
    );
    println!();
    println!("{}", "Append the digest to API_TOKEN_HASHES:".bright_white());
    println!("  API_TOKEN_HASHES=\"...,{}\"", digest);
    println!();
    println!("{}", "Example:".bright_white());
    println!(
        "  curl -H \"Authorization: Bearer {}\" http://localhost:3000/api/system/lookup/tables",
        token_value.bright_yellow()
    );
    println!();

    Ok(())
}

fn list_query(query: Option<String>) -> ListQuery {
    ListQuery {
        per_page: 500,
        sort: SortField::Name,
        order: SortOrder::Asc,
        query,
        ..ListQuery::default()
    }
}

async fn list_tables(pool: &PgPool, action: ListAction) -> Result<()> {
    let ListAction::List { query } = action;
    let repo = PgTableRepository::new(Arc::new(pool.clone()));

    println!("{}", "📋 Lookup Tables".bright_blue().bold());
    println!();

    let page = repo
        .list(&list_query(query))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list tables: {e}"))?;

    if page.items.is_empty() {
        println!("{}", "  No lookup tables found".yellow());
        return Ok(());
    }

    println!(
        "  {:<5} {:<24} {:<24} {:<24}",
        "ID".bright_white().bold(),
        "Name".bright_white().bold(),
        "Cache".bright_white().bold(),
        "Data adapter".bright_white().bold()
    );
    println!("  {}", "─".repeat(80).bright_black());

    for table in &page.items {
        println!(
            "  {:<5} {:<24} {:<24} {:<24}",
            table.id.to_string().bright_black(),
            table.name.cyan(),
            table.cache_name,
            table.data_adapter_name
        );
    }

    println!();
    println!("  Total: {}", page.total.to_string().bright_white().bold());
    println!();

    Ok(())
}

async fn list_components(pool: &PgPool, kind: ComponentKind, action: ListAction) -> Result<()> {
    let ListAction::List { query } = action;
    let repo = PgComponentRepository::new(Arc::new(pool.clone()));

    println!("{}", format!("📋 {}s", kind.label()).bright_blue().bold());
    println!();

    let page = repo
        .list(kind, &list_query(query))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list {kind} records: {e}"))?;

    if page.items.is_empty() {
        println!("{}", "  Nothing configured".yellow());
        return Ok(());
    }

    println!(
        "  {:<5} {:<24} {:<12} {:<30}",
        "ID".bright_white().bold(),
        "Name".bright_white().bold(),
        "Type".bright_white().bold(),
        "Title".bright_white().bold()
    );
    println!("  {}", "─".repeat(75).bright_black());

    for component in &page.items {
        println!(
            "  {:<5} {:<24} {:<12} {:<30}",
            component.id.to_string().bright_black(),
            component.name.cyan(),
            component.config.type_name(),
            component.title
        );
    }

    println!();
    println!("  Total: {}", page.total.to_string().bright_white().bold());
    println!();

    Ok(())
}

fn show_types() {
    let registries = Registries::builtin();

    println!("{}", "🧩 Cache types".bright_blue().bold());
    for (name, descriptor) in registries.caches.descriptors() {
        println!(
            "  {:<12} {}",
            name.cyan(),
            serde_json::to_string(&descriptor.default_config)
                .unwrap_or_default()
                .bright_black()
        );
    }
    println!();

    println!("{}", "🧩 Data adapter types".bright_blue().bold());
    for (name, descriptor) in registries.adapters.descriptors() {
        println!(
            "  {:<12} {}",
            name.cyan(),
            serde_json::to_string(&descriptor.default_config)
                .unwrap_or_default()
                .bright_black()
        );
    }
    println!();
}

/// Materializes the stored configuration in this process and resolves one key.
///
/// Instances built here are independent of any running server: they start
/// with empty caches and are stopped before the command exits.
async fn run_query(pool: &PgPool, table: &str, key: &str) -> Result<()> {
    let pool = Arc::new(pool.clone());
    let components: Arc<dyn ComponentRepository> =
        Arc::new(PgComponentRepository::new(pool.clone()));
    let tables: Arc<dyn TableRepository> = Arc::new(PgTableRepository::new(pool));
    let service = LookupService::new(Arc::new(Registries::builtin()), components, tables);

    service
        .refresh_all()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))?;

    let outcome = lookup_once(&service, table, key).await;

    service.shutdown().await;

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "❌ Lookup failed:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn lookup_once(
    service: &LookupService,
    table: &str,
    key: &str,
) -> Result<LookupResult, LookupError> {
    let view = service.new_builder().lookup_table(table).build()?;
    view.lookup(&LookupKey::new(key)).await
}

async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;
            let components: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lookup_components")
                .fetch_one(pool)
                .await?;
            let tables: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lookup_tables")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL:          {}", version.bright_white());
            println!(
                "  Caches and adapters: {}",
                components.to_string().bright_green().bold()
            );
            println!(
                "  Lookup tables:       {}",
                tables.to_string().bright_green().bold()
            );
            println!();
        }
    }

    Ok(())
}

/// Generates a cryptographically random token.
///
/// 48 characters from `A-Za-z0-9`, about 286 bits of entropy.
fn generate_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const TOKEN_LEN: usize = 48;

    let mut rng = rand::rng();

    (0..TOKEN_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}
