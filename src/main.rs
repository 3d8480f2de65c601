use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod auth;
mod classifier;
mod clusters;
mod config;
mod db;
mod error;
mod features;
mod models;
mod pipeline;
mod report;
mod risk;
mod session;
mod store;
mod walkthrough;

use config::Settings;
use store::{CareStore, PgStore};

#[derive(Parser)]
#[command(name = "campus-care")]
#[command(about = "Student wellbeing self-assessment and risk pathways", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Create an account
    SignUp {
        #[arg(long)]
        username: String,
        #[arg(long, env = "CAMPUS_CARE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Walk through a wellbeing session interactively
    Start,
    /// Print or write a user's dashboard as markdown
    Dashboard {
        #[arg(long)]
        username: String,
        #[arg(long, env = "CAMPUS_CARE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the reference cluster profiles
    Profiles {
        #[arg(long)]
        group: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.settings.log_level)?;
    let settings = cli.settings;

    match cli.command {
        Commands::InitDb => {
            let pool = settings.connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::SignUp { username, password } => {
            let pool = settings.connect().await?;
            auth::sign_up(&pool, &username, &password).await?;
            println!("Account created for {username}.");
        }
        Commands::Start => {
            let pool = settings.connect().await?;
            walkthrough::Walkthrough::new(PgStore::new(&pool), &settings)
                .run()
                .await?;
        }
        Commands::Dashboard {
            username,
            password,
            out,
        } => {
            let pool = settings.connect().await?;
            let store = PgStore::new(&pool);
            let user = store.log_in(&username, &password).await?;
            let dashboard = walkthrough::render_dashboard(&store, &settings, &user).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, dashboard)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Dashboard written to {}.", path.display());
                }
                None => print!("{dashboard}"),
            }
        }
        Commands::Profiles { group } => {
            let table = settings.cluster_table()?;
            let mut shown = 0usize;
            for profile in table.profiles() {
                if group.as_deref().is_some_and(|g| g != profile.group) {
                    continue;
                }
                print!("{}", report::describe_profile(profile));
                shown += 1;
            }
            if shown == 0 {
                println!("No cluster profiles found.");
            }
        }
    }

    Ok(())
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}
