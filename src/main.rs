use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod db;
mod metrics;
mod models;
mod report;
mod sheet;
mod view;

use crate::config::{Config, DatabaseConfig};
use crate::db::{PgRoster, Roster};
use crate::metrics::TierScales;
use crate::models::Table;

#[derive(Parser)]
#[command(name = "batpath")]
#[command(about = "Athlete performance dashboard for BATPATH coaches", long_about = None)]
struct Cli {
    /// JSON file with tier thresholds, overriding the built-in scales
    #[arg(long, global = true)]
    tiers: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the demo team, coach, players and test sessions
    Seed,
    /// Import test results from a sheet export (CSV)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Build a player report with history, tiers and leaderboards
    Report {
        #[arg(long)]
        player: String,
        #[arg(long)]
        metric: String,
        /// Read a sheet export instead of the database
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        top: Option<usize>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print a leaderboard for one metric
    Leaderboard {
        #[arg(long)]
        metric: String,
        /// Restrict the board to one team
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the player table for a team
    Roster {
        #[arg(long)]
        team: i32,
    },
    /// Run the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let tiers_file = cli.tiers.clone().or_else(config::tiers_file_from_env);
    let scales = match tiers_file {
        Some(path) => TierScales::from_file(&path)?,
        None => TierScales::default(),
    };

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&DatabaseConfig::from_env()?).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&DatabaseConfig::from_env()?).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&DatabaseConfig::from_env()?).await?;
            let (inserted, warnings) = db::import_csv(&pool, &csv).await?;
            print_warnings(&warnings);
            println!("Inserted {inserted} test results from {}.", csv.display());
        }
        Commands::Report {
            player,
            metric,
            csv,
            top,
            out,
        } => {
            let (table, warnings) = load_table(csv.as_deref()).await?;
            let request = view::ViewRequest {
                player: &player,
                metric: &metric,
                top,
            };

            let mut player_view = match view::build_view(&table, &request, &scales) {
                Ok(player_view) => player_view,
                Err(err) => {
                    print_warnings(&warnings);
                    println!("{err}");
                    return Ok(());
                }
            };
            let mut all_warnings = warnings;
            all_warnings.append(&mut player_view.warnings);
            player_view.warnings = all_warnings;

            let report = report::build_report(&player_view);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Leaderboard {
            metric,
            team,
            csv,
            top,
        } => {
            let (table, warnings) = load_table(csv.as_deref()).await?;
            print_warnings(&warnings);

            if table.is_empty() {
                println!("No data available.");
                return Ok(());
            }
            if !table.has_metric(&metric) {
                println!("Metric '{metric}' is not present in the loaded data.");
                return Ok(());
            }

            let output = match team.as_deref() {
                Some(team) => report::build_leaderboard(
                    &format!("{team} Leaderboard: {metric}"),
                    &metrics::team_leaderboard(&table, team, &metric, Some(top)),
                ),
                None => report::build_leaderboard(
                    &format!("Global Leaderboard: {metric}"),
                    &metrics::global_leaderboard(&table, &metric, Some(top)),
                ),
            };
            print!("{output}");
        }
        Commands::Roster { team } => {
            let pool = connect(&DatabaseConfig::from_env()?).await?;
            let roster = PgRoster::new(pool);
            let team_row = roster.fetch_team(team).await?;
            let players = roster.fetch_players_by_team(team).await?;
            print!("{}", report::build_roster(team_row.as_ref(), &players));
        }
        Commands::Serve => serve(scales).await?,
    }

    Ok(())
}

async fn connect(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
        .context("failed to connect to Postgres")
}

/// Loads the table from a sheet export when given, otherwise from the database.
async fn load_table(csv: Option<&Path>) -> anyhow::Result<(Table, Vec<String>)> {
    match csv {
        Some(path) => {
            let load = sheet::load_csv(path)
                .with_context(|| format!("failed to load sheet export {}", path.display()))?;
            Ok((load.table, load.warnings))
        }
        None => {
            let pool = connect(&DatabaseConfig::from_env()?).await?;
            let table = PgRoster::new(pool).fetch_records().await?;
            Ok((table, Vec::new()))
        }
    }
}

fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("Warning: {warning}");
    }
}

async fn serve(scales: TierScales) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    info!("configuration loaded");

    let pool = connect(&config.database).await?;
    db::init_db(&pool).await?;
    info!("database ready");

    let state = Arc::new(api::AppState {
        roster: Arc::new(PgRoster::new(pool)),
        sessions: auth::SessionService::new(&config.auth),
        scales,
        upload_dir: config.server.upload_dir.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("dashboard API listening on {}", addr);

    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
