use clap::{Parser, Subcommand};
use migrations::Migrator;
use retail_pos_api::db::{establish_connection_with_config, DbConfig};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Schema management for the retail POS database.
#[derive(Parser, Debug)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Overrides DATABASE_URL / APP__DATABASE_URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations, one by default
    Down {
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// List applied and pending migrations
    Status,
    /// Drop every table and re-apply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let url = match cli.database_url {
        Some(url) => url,
        None => std::env::var("APP__DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://retail_pos.db?mode=rwc".to_string()),
    };

    info!("Connecting to database");
    let db = establish_connection_with_config(&DbConfig {
        url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            Migrator::up(&db, steps).await?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&db, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => Migrator::status(&db).await?,
        Command::Fresh => {
            Migrator::fresh(&db).await?;
            info!("Database recreated");
        }
    }

    Ok(())
}
