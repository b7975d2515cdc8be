use campus_admin::app::auth::seed_break_glass;
use campus_admin::infra::config::{break_glass_credentials, AppConfig};
use campus_admin::{DatabaseService, ModelRegistry};
use std::path::Path;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-break-glass]\n\
         \n\
         Requires env vars:\n\
           DATABASE_URL\n\
         Optional:\n\
           BREAK_GLASS_USERNAME, BREAK_GLASS_PASSWORD (seed/refresh the emergency account)\n\
           DB_MAX_CONNECTIONS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, UPLOAD_DIR, PUBLIC_BASE_URL, BIND_ADDR\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_break_glass = args.iter().any(|a| a == "--skip-break-glass");

    // Force-read config (nice error messages if missing)
    let config = AppConfig::from_env()?;

    println!("> Preflight:");
    println!("  BIND_ADDR={}", config.bind_addr);
    println!("  DB_MAX_CONNECTIONS={}", config.db_max_connections);
    println!(
        "  PAGE_SIZE default={} max={}",
        config.default_page_size, config.max_page_size
    );
    println!("  UPLOAD_DIR={}", config.upload_dir.display());
    println!("  PUBLIC_BASE_URL={}", config.public_base_url);

    // Basic DB connectivity
    let db_service = DatabaseService::new(&config).await?;
    db_service.ping().await?;
    let version: String = sqlx::query_scalar("SHOW server_version")
        .fetch_one(db_service.pool())
        .await?;
    println!("  Postgres version: {}", version);

    // Schema
    let registry = ModelRegistry::with_catalog();
    let applied = db_service.ensure_schema(&registry).await?;
    println!("  Schema ensured ({} tables).", applied);
    println!("  Entities: {}", registry.list_models().join(", "));

    // Upload directory must be writable by the service.
    let upload_dir: &Path = &config.upload_dir;
    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| anyhow::anyhow!("UPLOAD_DIR {} is not usable: {}", upload_dir.display(), e))?;
    println!("  Upload directory is ready.");

    // Break-glass account
    if skip_break_glass {
        println!("  Skipping break-glass account (--skip-break-glass).");
    } else {
        match break_glass_credentials() {
            Some((username, password)) => {
                let id = seed_break_glass(db_service.pool(), &username, &password).await?;
                println!("  Break-glass account '{}' ready (users.id={}).", username, id);
            }
            None => {
                eprintln!(
                    "  Warning: BREAK_GLASS_USERNAME/BREAK_GLASS_PASSWORD not set; no emergency account seeded."
                );
            }
        }
    }

    println!("> Preflight OK.");
    Ok(())
}
