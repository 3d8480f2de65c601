use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::classifier::LinearModel;
use crate::clusters::ClusterTable;
use crate::error::Result;

/// Settings shared by every subcommand. Each flag falls back to an
/// environment variable.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Reference cluster profiles (CSV)
    #[arg(
        long,
        env = "CAMPUS_CARE_PROFILES",
        default_value = "data/cluster_profiles.csv",
        global = true
    )]
    pub profiles: PathBuf,

    /// Risk classifier artifact (JSON)
    #[arg(
        long,
        env = "CAMPUS_CARE_MODEL",
        default_value = "data/risk_model.json",
        global = true
    )]
    pub model: PathBuf,

    #[arg(long, env = "CAMPUS_CARE_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,

    /// Tracing filter, e.g. `info` or `campus_care=debug`
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

impl Settings {
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let database_url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;
        tracing::info!(max_connections = self.max_connections, "connected to Postgres");
        Ok(pool)
    }

    /// Reference table, read fresh for each use.
    pub fn cluster_table(&self) -> Result<ClusterTable> {
        ClusterTable::load(&self.profiles)
    }

    /// Classifier artifact, read fresh for each use.
    pub fn classifier(&self) -> Result<LinearModel> {
        LinearModel::load(&self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn defaults_point_at_bundled_artifacts() {
        let harness = Harness::parse_from(["campus-care"]);
        assert_eq!(
            harness.settings.profiles,
            PathBuf::from("data/cluster_profiles.csv")
        );
        assert_eq!(harness.settings.model, PathBuf::from("data/risk_model.json"));
    }

    #[test]
    fn flags_override_defaults() {
        let harness = Harness::parse_from([
            "campus-care",
            "--profiles",
            "/srv/profiles.csv",
            "--max-connections",
            "9",
        ]);
        assert_eq!(harness.settings.profiles, PathBuf::from("/srv/profiles.csv"));
        assert_eq!(harness.settings.max_connections, 9);
    }
}
