//! Reference cluster table and nearest-center assignment.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CareError, Result};
use crate::features::{ProfileVector, FEATURE_COUNT, PROFILE_FEATURES};
use crate::models::RiskGroup;

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    pub group: String,
    pub cluster: i32,
    pub name: String,
    pub description: String,
    pub center: ProfileVector,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(rename = "Group")]
    group: String,
    #[serde(rename = "Cluster")]
    cluster: i32,
    #[serde(rename = "Cluster_Name", default)]
    name: Option<String>,
    #[serde(rename = "Cluster_Description", default)]
    description: Option<String>,
    #[serde(rename = "Coursework_Pressure")]
    coursework_pressure: f64,
    #[serde(rename = "Study_Hours_Per_Week")]
    study_hours_per_week: f64,
    #[serde(rename = "Academic_Workload")]
    academic_workload: f64,
    #[serde(rename = "CoCurricular_Involvement")]
    cocurricular_involvement: f64,
    #[serde(rename = "Isolation_Frequency")]
    isolation_frequency: f64,
    #[serde(rename = "Physical_Activity_Freq")]
    physical_activity_freq: f64,
    #[serde(rename = "Sleep_Hours_Per_Night")]
    sleep_hours_per_night: f64,
    #[serde(rename = "Recent_Suicidal_Thoughts")]
    recent_suicidal_thoughts: f64,
    #[serde(rename = "Financial_Stress")]
    financial_stress: f64,
    #[serde(rename = "Age")]
    age: f64,
}

impl From<ProfileRow> for ClusterProfile {
    fn from(row: ProfileRow) -> Self {
        let name = row
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{} Cluster {}", row.group, row.cluster));
        let description = row
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "No description provided.".to_string());

        ClusterProfile {
            center: ProfileVector([
                row.coursework_pressure,
                row.study_hours_per_week,
                row.academic_workload,
                row.cocurricular_involvement,
                row.isolation_frequency,
                row.physical_activity_freq,
                row.sleep_hours_per_night,
                row.recent_suicidal_thoughts,
                row.financial_stress,
                row.age,
            ]),
            group: row.group,
            cluster: row.cluster,
            name,
            description,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterTable {
    profiles: Vec<ClusterProfile>,
}

impl ClusterTable {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            CareError::integrity(format!(
                "cannot open cluster profiles {}: {e}",
                path.display()
            ))
        })?;
        let table = Self::from_reader(file)?;
        tracing::debug!(
            path = %path.display(),
            rows = table.profiles.len(),
            "loaded cluster profiles"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let mut profiles = Vec::new();

        for (idx, result) in reader.deserialize::<ProfileRow>().enumerate() {
            let row = result.map_err(|e| {
                CareError::integrity(format!("malformed cluster profile row {}: {e}", idx + 1))
            })?;
            profiles.push(ClusterProfile::from(row));
        }

        Self::from_profiles(profiles)
    }

    pub fn from_profiles(profiles: Vec<ClusterProfile>) -> Result<Self> {
        for profile in &profiles {
            for (value, feature) in profile.center.values().iter().zip(PROFILE_FEATURES) {
                if !value.is_finite() || !(0.0..=1.0).contains(value) {
                    return Err(CareError::integrity(format!(
                        "{} cluster {} has {feature} = {value}, \
                         expected a normalized value in [0, 1]",
                        profile.group, profile.cluster
                    )));
                }
            }
        }
        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[ClusterProfile] {
        &self.profiles
    }

    /// Rows for one group, in table order.
    pub fn group<'a>(
        &'a self,
        label: &'a str,
    ) -> impl Iterator<Item = &'a ClusterProfile> + 'a {
        self.profiles.iter().filter(move |p| p.group == label)
    }

    pub fn profile(&self, group: &str, cluster: i32) -> Option<&ClusterProfile> {
        self.profiles
            .iter()
            .find(|p| p.group == group && p.cluster == cluster)
    }

    /// Display name and description for a stored assignment.
    pub fn describe(&self, group: RiskGroup, cluster: i32) -> (String, String) {
        match self.profile(group.as_str(), cluster) {
            Some(profile) => (profile.name.clone(), profile.description.clone()),
            None => (
                format!("{group} Cluster {cluster}"),
                "No description available.".to_string(),
            ),
        }
    }

    /// Nearest-center assignment within `group_label`.
    ///
    /// The raw input is scaled with a min-max scaler fit on the group's own
    /// rows, then compared by Euclidean distance against each row's center.
    /// Equal distances resolve to the row that appears first in the table.
    pub fn assign_cluster(&self, input: &ProfileVector, group_label: &str) -> Result<i32> {
        if input.values().iter().any(|v| !v.is_finite()) {
            return Err(CareError::integrity("survey vector contains a non-finite value"));
        }

        let rows: Vec<&ClusterProfile> = self.group(group_label).collect();
        if rows.is_empty() {
            return Err(CareError::integrity(format!(
                "no cluster profiles for group '{group_label}'"
            )));
        }

        let scaler = MinMaxScaler::fit(rows.iter().map(|p| &p.center));
        let scaled = scaler.transform(input);

        let mut best: Option<(i32, f64)> = None;
        for row in &rows {
            let distance = euclidean(&scaled, &row.center);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((row.cluster, distance)),
            }
        }

        best.map(|(cluster, _)| cluster).ok_or_else(|| {
            CareError::integrity(format!("no nearest cluster found for group '{group_label}'"))
        })
    }
}

/// Per-feature min-max scaler over a set of reference vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: [f64; FEATURE_COUNT],
    max: [f64; FEATURE_COUNT],
}

impl MinMaxScaler {
    pub fn fit<'a>(rows: impl IntoIterator<Item = &'a ProfileVector>) -> Self {
        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];
        let mut seen = false;

        for row in rows {
            seen = true;
            for (idx, value) in row.values().iter().enumerate() {
                min[idx] = min[idx].min(*value);
                max[idx] = max[idx].max(*value);
            }
        }

        if !seen {
            min = [0.0; FEATURE_COUNT];
            max = [0.0; FEATURE_COUNT];
        }
        Self { min, max }
    }

    /// A feature with no spread in the reference rows scales to 0.
    pub fn transform(&self, input: &ProfileVector) -> ProfileVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (idx, value) in input.values().iter().enumerate() {
            let range = self.max[idx] - self.min[idx];
            out[idx] = if range == 0.0 {
                0.0
            } else {
                (value - self.min[idx]) / range
            };
        }
        ProfileVector(out)
    }
}

fn euclidean(a: &ProfileVector, b: &ProfileVector) -> f64 {
    a.values()
        .iter()
        .zip(b.values())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
