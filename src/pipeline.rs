use crate::classifier::RiskClassifier;
use crate::clusters::ClusterTable;
use crate::error::Result;
use crate::features::WellbeingSurvey;
use crate::models::{Prediction, RiskGroup};

#[derive(Debug, Clone, PartialEq)]
pub struct AssignedCluster {
    pub group: RiskGroup,
    pub cluster: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub prediction: Prediction,
    /// Present only for moderate and severe predictions.
    pub cluster: Option<AssignedCluster>,
}

/// Score a completed long-form survey and, for flagged users, place them in
/// the nearest behavioral cluster of their risk group.
pub fn assess(
    survey: &WellbeingSurvey,
    classifier: &dyn RiskClassifier,
    table: &ClusterTable,
) -> Result<RiskAssessment> {
    survey.validate()?;
    let prediction = classifier.predict(&survey.model_input())?;

    let cluster = match prediction.cluster_group() {
        None => None,
        Some(group) => {
            let cluster = table.assign_cluster(&survey.profile_vector(), group.as_str())?;
            let (name, description) = table.describe(group, cluster);
            Some(AssignedCluster {
                group,
                cluster,
                name,
                description,
            })
        }
    };

    tracing::debug!(
        prediction = prediction.code(),
        cluster = cluster.as_ref().map(|c| c.cluster),
        "assessed long-form survey"
    );

    Ok(RiskAssessment {
        prediction,
        cluster,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CareError;
    use crate::features::ModelInput;

    struct Fixed(Result<Prediction>);

    impl RiskClassifier for Fixed {
        fn predict(&self, _input: &ModelInput) -> Result<Prediction> {
            match &self.0 {
                Ok(p) => Ok(*p),
                Err(_) => Err(CareError::model("model offline")),
            }
        }
    }

    const TABLE: &str = "Group,Cluster,Cluster_Name,Cluster_Description,Coursework_Pressure,Study_Hours_Per_Week,Academic_Workload,CoCurricular_Involvement,Isolation_Frequency,Physical_Activity_Freq,Sleep_Hours_Per_Night,Recent_Suicidal_Thoughts,Financial_Stress,Age
Severe,4,Severe Low,First severe,0,0,0,0,0,0,0,0,0,0
Moderate,1,Moderate Low,First moderate,0,0,0,0,0,0,0,0,0,0
Moderate,0,Moderate High,Second moderate,1,1,1,1,1,1,1,1,1,1
Severe,6,Severe High,Second severe,1,1,1,1,1,1,1,1,1,1
";

    fn table() -> ClusterTable {
        ClusterTable::from_reader(TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn minimal_prediction_skips_clustering() {
        let outcome = assess(
            &WellbeingSurvey::default(),
            &Fixed(Ok(Prediction::Minimal)),
            &table(),
        )
        .unwrap();
        assert_eq!(outcome.prediction, Prediction::Minimal);
        assert!(outcome.cluster.is_none());
    }

    #[test]
    fn moderate_prediction_searches_moderate_rows_only() {
        let outcome = assess(
            &WellbeingSurvey::default(),
            &Fixed(Ok(Prediction::Moderate)),
            &table(),
        )
        .unwrap();
        let cluster = outcome.cluster.unwrap();
        assert_eq!(cluster.group, RiskGroup::Moderate);
        assert!([0, 1].contains(&cluster.cluster));
    }

    #[test]
    fn severe_assessment_carries_cluster_details() {
        let survey = WellbeingSurvey {
            academic_workload: 1,
            coursework_pressure: 1,
            physical_activity: 1,
            financial_stress: 1,
            cocurricular_involvement: 1,
            isolation: 1,
            ..WellbeingSurvey::default()
        };
        let outcome = assess(&survey, &Fixed(Ok(Prediction::Severe)), &table()).unwrap();
        let cluster = outcome.cluster.unwrap();
        assert_eq!(cluster.group, RiskGroup::Severe);
        assert_eq!(cluster.cluster, 6);
        assert_eq!(cluster.name, "Severe High");
        assert_eq!(cluster.description, "Second severe");
    }

    #[test]
    fn classifier_failure_is_reported() {
        let err = assess(
            &WellbeingSurvey::default(),
            &Fixed(Err(CareError::model("x"))),
            &table(),
        )
        .unwrap_err();
        assert!(matches!(err, CareError::ModelInvocation(_)));
    }

    #[test]
    fn invalid_survey_never_reaches_classifier() {
        let survey = WellbeingSurvey {
            age: 90,
            ..WellbeingSurvey::default()
        };
        let err = assess(&survey, &Fixed(Ok(Prediction::Severe)), &table()).unwrap_err();
        assert!(matches!(err, CareError::DataIntegrity(_)));
    }
}
