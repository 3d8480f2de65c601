use crate::error::{CareError, Result};
use crate::models::RiskLevel;

pub const SHORT_FORM_ITEMS: usize = 7;
pub const LIKERT_MIN: i32 = 1;
pub const LIKERT_MAX: i32 = 5;
pub const MIN_TOTAL: i32 = SHORT_FORM_ITEMS as i32 * LIKERT_MIN;
pub const MAX_TOTAL: i32 = SHORT_FORM_ITEMS as i32 * LIKERT_MAX;
/// Scores at or below this go to the high-risk pathway.
pub const HIGH_RISK_CUTOFF: i32 = 21;

/// Seven short-form answers, each on the 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortFormResponses([i32; SHORT_FORM_ITEMS]);

impl ShortFormResponses {
    pub fn new(answers: [i32; SHORT_FORM_ITEMS]) -> Result<Self> {
        for (idx, answer) in answers.iter().enumerate() {
            check_likert(idx, *answer)?;
        }
        Ok(Self(answers))
    }

    /// Every answer set to the middle of the scale.
    pub fn neutral() -> Self {
        Self([3; SHORT_FORM_ITEMS])
    }

    pub fn answers(&self) -> &[i32; SHORT_FORM_ITEMS] {
        &self.0
    }

    /// Replace one answer. `item` is zero-based.
    pub fn set(&mut self, item: usize, answer: i32) -> Result<()> {
        if item >= SHORT_FORM_ITEMS {
            return Err(CareError::integrity(format!(
                "question {} does not exist (1..={SHORT_FORM_ITEMS})",
                item + 1
            )));
        }
        check_likert(item, answer)?;
        self.0[item] = answer;
        Ok(())
    }
}

impl TryFrom<&[i32]> for ShortFormResponses {
    type Error = CareError;

    fn try_from(values: &[i32]) -> Result<Self> {
        let answers: [i32; SHORT_FORM_ITEMS] = values.try_into().map_err(|_| {
            CareError::integrity(format!(
                "expected {SHORT_FORM_ITEMS} answers, got {}",
                values.len()
            ))
        })?;
        Self::new(answers)
    }
}

fn check_likert(idx: usize, answer: i32) -> Result<()> {
    if !(LIKERT_MIN..=LIKERT_MAX).contains(&answer) {
        return Err(CareError::integrity(format!(
            "answer {} to question {} is outside {LIKERT_MIN}..={LIKERT_MAX}",
            answer,
            idx + 1
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortFormResult {
    pub total_score: i32,
    pub risk_level: RiskLevel,
}

pub fn route(responses: &ShortFormResponses) -> ShortFormResult {
    let total_score: i32 = responses.answers().iter().sum();
    ShortFormResult {
        total_score,
        risk_level: level_for(total_score),
    }
}

/// Route an already-summed score coming from outside the form, such as a
/// stored row. Scores outside the possible range are rejected, never clamped.
pub fn route_total(total_score: i32) -> Result<ShortFormResult> {
    if !(MIN_TOTAL..=MAX_TOTAL).contains(&total_score) {
        return Err(CareError::integrity(format!(
            "total score {total_score} is outside {MIN_TOTAL}..={MAX_TOTAL}"
        )));
    }
    Ok(ShortFormResult {
        total_score,
        risk_level: level_for(total_score),
    })
}

fn level_for(total_score: i32) -> RiskLevel {
    if total_score <= HIGH_RISK_CUTOFF {
        RiskLevel::High
    } else {
        RiskLevel::Low
    }
}
