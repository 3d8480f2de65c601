//! Long-form survey answers and the two fixed-order vectors derived from them.
//!
//! The classifier and the cluster table each expect the ten features in their
//! own order. Both vectors can only be built from a [`WellbeingSurvey`], so a
//! caller never assembles a positional list by hand.

use crate::error::{CareError, Result};

pub const FEATURE_COUNT: usize = 10;

/// Column order the classifier was trained on.
pub const MODEL_FEATURES: [&str; FEATURE_COUNT] = [
    "Age",
    "Study_Hours_Per_Week",
    "Academic_Workload",
    "Coursework_Pressure",
    "Sleep_Hours_Per_Night",
    "Physical_Activity_Freq",
    "Financial_Stress",
    "CoCurricular_Involvement",
    "Isolation_Frequency",
    "Recent_Suicidal_Thoughts",
];

/// Column order of the cluster profile centers.
pub const PROFILE_FEATURES: [&str; FEATURE_COUNT] = [
    "Coursework_Pressure",
    "Study_Hours_Per_Week",
    "Academic_Workload",
    "CoCurricular_Involvement",
    "Isolation_Frequency",
    "Physical_Activity_Freq",
    "Sleep_Hours_Per_Night",
    "Recent_Suicidal_Thoughts",
    "Financial_Stress",
    "Age",
];

#[derive(Debug, Clone, PartialEq)]
pub struct WellbeingSurvey {
    pub age: i32,
    pub study_hours_per_week: i32,
    pub academic_workload: i32,
    pub coursework_pressure: i32,
    pub sleep_hours_per_night: f64,
    pub physical_activity: i32,
    pub financial_stress: i32,
    pub cocurricular_involvement: i32,
    pub isolation: i32,
    pub suicidal_thoughts: bool,
}

impl Default for WellbeingSurvey {
    fn default() -> Self {
        Self {
            age: 16,
            study_hours_per_week: 0,
            academic_workload: 3,
            coursework_pressure: 3,
            sleep_hours_per_night: 0.0,
            physical_activity: 3,
            financial_stress: 3,
            cocurricular_involvement: 3,
            isolation: 3,
            suicidal_thoughts: false,
        }
    }
}

impl WellbeingSurvey {
    pub fn validate(&self) -> Result<()> {
        check_range("age", self.age, 16, 30)?;
        check_range("study hours per week", self.study_hours_per_week, 0, 100)?;
        check_range("academic workload", self.academic_workload, 1, 5)?;
        check_range("coursework pressure", self.coursework_pressure, 1, 5)?;
        check_range("physical activity", self.physical_activity, 1, 5)?;
        check_range("financial stress", self.financial_stress, 1, 5)?;
        check_range("co-curricular involvement", self.cocurricular_involvement, 1, 5)?;
        check_range("isolation", self.isolation, 1, 5)?;
        if !(0.0..=12.0).contains(&self.sleep_hours_per_night) {
            return Err(CareError::integrity(format!(
                "sleep hours per night {} is outside 0..=12",
                self.sleep_hours_per_night
            )));
        }
        Ok(())
    }

    pub fn suicidal_flag(&self) -> i32 {
        i32::from(self.suicidal_thoughts)
    }

    /// Set a field from its command name, as typed in the interactive session.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<()> {
        let parse_int = |value: &str| {
            value
                .parse::<i32>()
                .map_err(|_| CareError::integrity(format!("'{value}' is not a whole number")))
        };
        match field {
            "age" => self.age = parse_int(value)?,
            "study_hours" => self.study_hours_per_week = parse_int(value)?,
            "academic_workload" => self.academic_workload = parse_int(value)?,
            "coursework_pressure" => self.coursework_pressure = parse_int(value)?,
            "sleep_hours" => {
                self.sleep_hours_per_night = value
                    .parse::<f64>()
                    .map_err(|_| CareError::integrity(format!("'{value}' is not a number")))?
            }
            "physical_activity" => self.physical_activity = parse_int(value)?,
            "financial_stress" => self.financial_stress = parse_int(value)?,
            "cocurricular" => self.cocurricular_involvement = parse_int(value)?,
            "isolation" => self.isolation = parse_int(value)?,
            "suicidal_thoughts" => {
                self.suicidal_thoughts = match value.to_ascii_lowercase().as_str() {
                    "yes" | "y" | "1" => true,
                    "no" | "n" | "0" => false,
                    other => {
                        return Err(CareError::integrity(format!(
                            "'{other}' is not yes or no"
                        )))
                    }
                }
            }
            other => {
                return Err(CareError::integrity(format!("unknown survey field '{other}'")))
            }
        }
        Ok(())
    }

    pub fn model_input(&self) -> ModelInput {
        ModelInput([
            f64::from(self.age),
            f64::from(self.study_hours_per_week),
            f64::from(self.academic_workload),
            f64::from(self.coursework_pressure),
            self.sleep_hours_per_night,
            f64::from(self.physical_activity),
            f64::from(self.financial_stress),
            f64::from(self.cocurricular_involvement),
            f64::from(self.isolation),
            f64::from(self.suicidal_flag()),
        ])
    }

    /// Raw (unscaled) answers in cluster profile order.
    pub fn profile_vector(&self) -> ProfileVector {
        ProfileVector([
            f64::from(self.coursework_pressure),
            f64::from(self.study_hours_per_week),
            f64::from(self.academic_workload),
            f64::from(self.cocurricular_involvement),
            f64::from(self.isolation),
            f64::from(self.physical_activity),
            self.sleep_hours_per_night,
            f64::from(self.suicidal_flag()),
            f64::from(self.financial_stress),
            f64::from(self.age),
        ])
    }
}

pub const SURVEY_FIELDS: [&str; FEATURE_COUNT] = [
    "age",
    "study_hours",
    "academic_workload",
    "coursework_pressure",
    "sleep_hours",
    "physical_activity",
    "financial_stress",
    "cocurricular",
    "isolation",
    "suicidal_thoughts",
];

fn check_range(name: &str, value: i32, min: i32, max: i32) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(CareError::integrity(format!(
            "{name} {value} is outside {min}..={max}"
        )));
    }
    Ok(())
}

/// Classifier input in [`MODEL_FEATURES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelInput([f64; FEATURE_COUNT]);

impl ModelInput {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}

/// Feature vector in [`PROFILE_FEATURES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileVector(pub(crate) [f64; FEATURE_COUNT]);

impl ProfileVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}
