use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::clusters::ClusterTable;
use crate::error::{CareError, Result};
use crate::features::WellbeingSurvey;
use crate::models::{LatestReflection, Prediction, RecentCluster, RiskGroup, SelfCheckStats};
use crate::risk::ShortFormResult;

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("schema ready");
    Ok(())
}

pub async fn save_self_check_visit(
    pool: &PgPool,
    user_id: Uuid,
    result: &ShortFormResult,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO campus_care.self_check_logs (user_id, score, risk_level)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(result.total_score)
    .bind(result.risk_level.as_str())
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        score = result.total_score,
        risk_level = %result.risk_level,
        "saved self-check visit"
    );
    Ok(())
}

/// Record a flagged long-form assessment together with its cluster.
pub async fn save_high_risk_response(
    pool: &PgPool,
    user_id: Uuid,
    survey: &WellbeingSurvey,
    prediction: Prediction,
    cluster: i32,
) -> Result<()> {
    if prediction.cluster_group().is_none() {
        return Err(CareError::integrity(
            "only moderate or severe assessments carry a cluster",
        ));
    }

    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO campus_care.high_risk_responses (
            user_id, age, study_hours, coursework_pressure, academic_workload,
            sleep_hours, physical_activity, isolation, financial_stress,
            cocurricular, suicidal_thoughts, prediction_result, cluster
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(user_id)
    .bind(survey.age)
    .bind(survey.study_hours_per_week)
    .bind(survey.coursework_pressure)
    .bind(survey.academic_workload)
    .bind(survey.sleep_hours_per_night)
    .bind(survey.physical_activity)
    .bind(survey.isolation)
    .bind(survey.financial_stress)
    .bind(survey.cocurricular_involvement)
    .bind(survey.suicidal_flag() as i16)
    .bind(prediction.code() as i16)
    .bind(cluster)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        prediction = prediction.code(),
        cluster,
        "saved high-risk response"
    );
    Ok(())
}

pub async fn save_reflection(
    pool: &PgPool,
    user_id: Uuid,
    module_name: &str,
    text: &str,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO campus_care.user_reflections (user_id, module_name, reflection)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(module_name)
    .bind(text)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = %user_id, module_name, "saved reflection");
    Ok(())
}

pub async fn get_self_check_stats(pool: &PgPool, user_id: Uuid) -> Result<SelfCheckStats> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE risk_level = 'Low') AS low,
               COUNT(*) FILTER (WHERE risk_level = 'High') AS high
        FROM campus_care.self_check_logs
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(SelfCheckStats {
        total: row.get("total"),
        low: row.get("low"),
        high: row.get("high"),
    })
}

/// Most recent cluster assignments first, labelled from the reference table.
pub async fn get_recent_clusters(
    pool: &PgPool,
    table: &ClusterTable,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<RecentCluster>> {
    let rows = sqlx::query(
        r#"
        SELECT cluster, prediction_result, submitted_at
        FROM campus_care.high_risk_responses
        WHERE user_id = $1
        ORDER BY submitted_at DESC, id DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut clusters = Vec::with_capacity(rows.len());
    for row in rows {
        let cluster: i32 = row.get("cluster");
        let prediction: i16 = row.get("prediction_result");
        let submitted_at: DateTime<Utc> = row.get("submitted_at");

        let group = RiskGroup::from_prediction_code(i32::from(prediction));
        let (label, description) = table.describe(group, cluster);
        clusters.push(RecentCluster {
            label,
            date: submitted_at.date_naive(),
            description,
        });
    }

    Ok(clusters)
}

/// Latest reflection per module, keyed by stored module name.
pub async fn get_latest_reflections(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<BTreeMap<String, LatestReflection>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT ON (module_name) module_name, reflection, created_at
        FROM campus_care.user_reflections
        WHERE user_id = $1
        ORDER BY module_name, created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut latest = BTreeMap::new();
    for row in rows {
        latest.insert(
            row.get::<String, _>("module_name"),
            LatestReflection {
                text: row.get("reflection"),
                created_at: row.get("created_at"),
            },
        );
    }

    Ok(latest)
}
