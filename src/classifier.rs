//! Risk classifier over the long-form survey.
//!
//! The trained model ships as a JSON artifact describing a multinomial linear
//! classifier. Its declared feature order must match [`MODEL_FEATURES`]
//! exactly; an artifact trained on a different column order is refused at
//! load time rather than silently mis-scored.

use std::path::Path;

use serde::Deserialize;

use crate::error::{CareError, Result};
use crate::features::{ModelInput, FEATURE_COUNT, MODEL_FEATURES};
use crate::models::Prediction;

pub trait RiskClassifier {
    fn predict(&self, input: &ModelInput) -> Result<Prediction>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Standardization {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    pub classes: Vec<i32>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default)]
    pub standardization: Option<Standardization>,
}

impl LinearModel {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CareError::model(format!(
                "classifier unavailable at {}: {e}",
                path.display()
            ))
        })?;
        let model = Self::from_json(&raw)?;
        tracing::debug!(
            path = %path.display(),
            classes = model.classes.len(),
            "loaded risk classifier"
        );
        Ok(model)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let model: LinearModel = serde_json::from_str(raw)
            .map_err(|e| CareError::model(format!("malformed classifier artifact: {e}")))?;
        model.check_shape()?;
        Ok(model)
    }

    fn check_shape(&self) -> Result<()> {
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(MODEL_FEATURES)
                .any(|(name, expected)| name != expected)
        {
            return Err(CareError::model(format!(
                "classifier expects features {:?}, not {:?}",
                self.feature_names, MODEL_FEATURES
            )));
        }

        if self.classes.is_empty() {
            return Err(CareError::model("classifier declares no classes"));
        }
        for class in &self.classes {
            Prediction::try_from(*class)?;
        }

        if self.coefficients.len() != self.classes.len()
            || self.intercepts.len() != self.classes.len()
        {
            return Err(CareError::model(format!(
                "classifier has {} classes but {} coefficient rows and {} intercepts",
                self.classes.len(),
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        if self.coefficients.iter().any(|row| row.len() != FEATURE_COUNT) {
            return Err(CareError::model(format!(
                "every coefficient row must have {FEATURE_COUNT} weights"
            )));
        }

        if let Some(std) = &self.standardization {
            if std.mean.len() != FEATURE_COUNT || std.scale.len() != FEATURE_COUNT {
                return Err(CareError::model(format!(
                    "standardization must have {FEATURE_COUNT} means and scales"
                )));
            }
            if std.scale.iter().any(|s| *s == 0.0) {
                return Err(CareError::model("standardization scale contains zero"));
            }
        }
        Ok(())
    }

    fn prepare(&self, input: &ModelInput) -> [f64; FEATURE_COUNT] {
        let mut values = *input.values();
        if let Some(std) = &self.standardization {
            for (idx, value) in values.iter_mut().enumerate() {
                *value = (*value - std.mean[idx]) / std.scale[idx];
            }
        }
        values
    }
}

impl RiskClassifier for LinearModel {
    fn predict(&self, input: &ModelInput) -> Result<Prediction> {
        let values = self.prepare(input);
        let mut best: Option<(i32, f64)> = None;

        for ((class, weights), intercept) in self
            .classes
            .iter()
            .zip(&self.coefficients)
            .zip(&self.intercepts)
        {
            let score = intercept
                + weights
                    .iter()
                    .zip(values.iter())
                    .map(|(w, x)| w * x)
                    .sum::<f64>();
            if !score.is_finite() {
                return Err(CareError::model(format!(
                    "class {class} produced a non-finite score"
                )));
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((*class, score)),
            }
        }

        let (class, _) =
            best.ok_or_else(|| CareError::model("classifier produced no scores"))?;
        Prediction::try_from(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::WellbeingSurvey;

    fn artifact(features: &[&str], standardization: &str) -> String {
        let names = serde_json::to_string(features).unwrap();
        format!(
            r#"{{
                "feature_names": {names},
                "classes": [0, 1, 2],
                "coefficients": [
                    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
                    [0, 0, 0, 1, 0, 0, 0, 0, 0, 0],
                    [0, 0, 0, 0, 0, 0, 0, 0, 0, 10]
                ],
                "intercepts": [3.5, 0, 0]
                {standardization}
            }}"#
        )
    }

    fn survey(coursework_pressure: i32, suicidal_thoughts: bool) -> WellbeingSurvey {
        WellbeingSurvey {
            coursework_pressure,
            suicidal_thoughts,
            ..WellbeingSurvey::default()
        }
    }

    #[test]
    fn picks_highest_scoring_class() {
        let model = LinearModel::from_json(&artifact(&MODEL_FEATURES, "")).unwrap();
        let low = survey(2, false).model_input();
        let pressured = survey(5, false).model_input();
        let flagged = survey(5, true).model_input();

        assert_eq!(model.predict(&low).unwrap(), Prediction::Minimal);
        assert_eq!(model.predict(&pressured).unwrap(), Prediction::Moderate);
        assert_eq!(model.predict(&flagged).unwrap(), Prediction::Severe);
    }

    #[test]
    fn refuses_reordered_features() {
        let mut reordered = MODEL_FEATURES;
        reordered.swap(0, 9);
        let err = LinearModel::from_json(&artifact(&reordered, "")).unwrap_err();
        assert!(matches!(err, CareError::ModelInvocation(_)));
    }

    #[test]
    fn refuses_bad_shapes_and_classes() {
        let raw = artifact(&MODEL_FEATURES, "").replace("[0, 1, 2]", "[0, 1, 3]");
        assert!(LinearModel::from_json(&raw).is_err());

        let raw = artifact(&MODEL_FEATURES, "").replace("[3.5, 0, 0]", "[3.5, 0]");
        assert!(LinearModel::from_json(&raw).is_err());

        assert!(LinearModel::from_json("not json").is_err());
    }

    #[test]
    fn applies_standardization_before_scoring() {
        // Centering coursework pressure at 5 pulls class 1 below class 0.
        let std = r#", "standardization": {
            "mean": [0, 0, 0, 5, 0, 0, 0, 0, 0, 0],
            "scale": [1, 1, 1, 1, 1, 1, 1, 1, 1, 1]
        }"#;
        let model = LinearModel::from_json(&artifact(&MODEL_FEATURES, std)).unwrap();
        let pressured = survey(5, false).model_input();
        assert_eq!(model.predict(&pressured).unwrap(), Prediction::Minimal);
    }

    #[test]
    fn missing_artifact_is_a_model_error() {
        let err = LinearModel::load(Path::new("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, CareError::ModelInvocation(_)));
    }

    #[test]
    fn bundled_artifact_loads() {
        let model = LinearModel::from_json(include_str!("../data/risk_model.json")).unwrap();
        let prediction = model.predict(&WellbeingSurvey::default().model_input());
        assert!(prediction.is_ok());
    }
}
