//! Storage seam for the interactive session.
//!
//! The walkthrough only talks to a `CareStore`, so the Postgres-backed
//! `PgStore` can be swapped for an in-memory store in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth;
use crate::clusters::ClusterTable;
use crate::db;
use crate::error::Result;
use crate::features::WellbeingSurvey;
use crate::models::{LatestReflection, Prediction, RecentCluster, SelfCheckStats, User};
use crate::risk::ShortFormResult;

#[async_trait]
pub trait CareStore: Send + Sync {
    async fn sign_up(&self, username: &str, password: &str) -> Result<()>;

    /// Validate credentials and resolve the account.
    async fn log_in(&self, username: &str, password: &str) -> Result<User>;

    async fn save_self_check_visit(&self, user_id: Uuid, result: &ShortFormResult) -> Result<()>;

    /// Returns only once the response is committed.
    async fn save_high_risk_response(
        &self,
        user_id: Uuid,
        survey: &WellbeingSurvey,
        prediction: Prediction,
        cluster: i32,
    ) -> Result<()>;

    async fn save_reflection(&self, user_id: Uuid, module_name: &str, text: &str) -> Result<()>;

    async fn self_check_stats(&self, user_id: Uuid) -> Result<SelfCheckStats>;

    async fn recent_clusters(
        &self,
        table: &ClusterTable,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentCluster>>;

    async fn latest_reflections(&self, user_id: Uuid)
        -> Result<BTreeMap<String, LatestReflection>>;
}

/// `CareStore` over the `campus_care` Postgres schema.
#[derive(Debug, Clone, Copy)]
pub struct PgStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgStore<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CareStore for PgStore<'_> {
    async fn sign_up(&self, username: &str, password: &str) -> Result<()> {
        auth::sign_up(self.pool, username, password).await
    }

    async fn log_in(&self, username: &str, password: &str) -> Result<User> {
        auth::log_in(self.pool, username, password).await
    }

    async fn save_self_check_visit(&self, user_id: Uuid, result: &ShortFormResult) -> Result<()> {
        db::save_self_check_visit(self.pool, user_id, result).await
    }

    async fn save_high_risk_response(
        &self,
        user_id: Uuid,
        survey: &WellbeingSurvey,
        prediction: Prediction,
        cluster: i32,
    ) -> Result<()> {
        db::save_high_risk_response(self.pool, user_id, survey, prediction, cluster).await
    }

    async fn save_reflection(&self, user_id: Uuid, module_name: &str, text: &str) -> Result<()> {
        db::save_reflection(self.pool, user_id, module_name, text).await
    }

    async fn self_check_stats(&self, user_id: Uuid) -> Result<SelfCheckStats> {
        db::get_self_check_stats(self.pool, user_id).await
    }

    async fn recent_clusters(
        &self,
        table: &ClusterTable,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentCluster>> {
        db::get_recent_clusters(self.pool, table, user_id, limit).await
    }

    async fn latest_reflections(
        &self,
        user_id: Uuid,
    ) -> Result<BTreeMap<String, LatestReflection>> {
        db::get_latest_reflections(self.pool, user_id).await
    }
}
