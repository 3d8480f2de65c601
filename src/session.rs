//! Per-user session context and the page state machine it walks.
//!
//! ```text
//! overview -> auth -> self_check -> high_risk_pathway ---------------> dashboard
//!                                \-> low_risk_pathway -> low_risk_modules -/
//! ```
//!
//! `log_out` returns any authenticated page to `overview`. Unauthenticated
//! sessions only ever sit on `overview` or `auth`.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::features::WellbeingSurvey;
use crate::models::{Prediction, User};
use crate::risk::{self, ShortFormResponses, ShortFormResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Auth,
    SelfCheck,
    HighRiskPathway,
    LowRiskPathway,
    LowRiskModules,
    Dashboard,
}

impl Page {
    pub fn slug(&self) -> &'static str {
        match self {
            Page::Overview => "overview",
            Page::Auth => "auth",
            Page::SelfCheck => "self_check",
            Page::HighRiskPathway => "high_risk_pathway",
            Page::LowRiskPathway => "low_risk_pathway",
            Page::LowRiskModules => "low_risk_modules",
            Page::Dashboard => "dashboard",
        }
    }

    /// Journey progress shown to signed-in users. The auth page is not a
    /// step of the journey.
    pub fn progress_pct(&self) -> Option<u32> {
        const STEPS: [Page; 6] = [
            Page::Overview,
            Page::SelfCheck,
            Page::HighRiskPathway,
            Page::LowRiskPathway,
            Page::LowRiskModules,
            Page::Dashboard,
        ];
        STEPS
            .iter()
            .position(|p| p == self)
            .map(|idx| ((idx as u32 + 1) * 100) / STEPS.len() as u32)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WellnessModule {
    Anxiety,
    Gratitude,
    Wellness,
}

impl WellnessModule {
    pub const ALL: [WellnessModule; 3] = [
        WellnessModule::Anxiety,
        WellnessModule::Gratitude,
        WellnessModule::Wellness,
    ];

    pub fn number(&self) -> usize {
        match self {
            WellnessModule::Anxiety => 1,
            WellnessModule::Gratitude => 2,
            WellnessModule::Wellness => 3,
        }
    }

    pub fn from_number(number: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.number() == number)
    }

    /// Name reflections are stored under.
    pub fn storage_name(&self) -> String {
        format!("Module {}", self.number())
    }

    pub fn title(&self) -> &'static str {
        match self {
            WellnessModule::Anxiety => "Understanding Anxiety in University Life",
            WellnessModule::Gratitude => "2-Minute Gratitude Reflection",
            WellnessModule::Wellness => "What Mental Wellness Means to You",
        }
    }

    pub fn question(&self) -> &'static str {
        match self {
            WellnessModule::Anxiety => {
                "What's something you've learned or resonated with about anxiety in university life?"
            }
            WellnessModule::Gratitude => "What is something you're grateful for today?",
            WellnessModule::Wellness => "What does mental wellness mean to you right now?",
        }
    }

    /// Reflection question for a stored module name.
    pub fn question_for(storage_name: &str) -> &'static str {
        Self::ALL
            .into_iter()
            .find(|m| m.storage_name() == storage_name)
            .map(|m| m.question())
            .unwrap_or("Reflection Question")
    }

    fn previous(&self) -> Option<Self> {
        match self {
            WellnessModule::Anxiety => None,
            WellnessModule::Gratitude => Some(WellnessModule::Anxiety),
            WellnessModule::Wellness => Some(WellnessModule::Gratitude),
        }
    }
}

impl fmt::Display for WellnessModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Module {}", self.number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("please log in to continue")]
    NotAuthenticated,

    #[error("you are already logged in")]
    AlreadyAuthenticated,

    #[error("cannot {action} from the {from} page")]
    NotAllowed { action: &'static str, from: Page },

    #[error("{module} is locked until {required} is complete")]
    ModuleLocked {
        module: WellnessModule,
        required: WellnessModule,
    },

    #[error("{0} is already complete")]
    ModuleAlreadyComplete(WellnessModule),

    #[error("finish all wellness modules before opening the dashboard")]
    ModulesIncomplete,

    #[error("take your wellbeing snapshot first")]
    NoSnapshot,
}

/// Result of evaluating the short-form draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfCheckSnapshot {
    pub result: ShortFormResult,
    /// False when these exact answers were already recorded as a visit.
    pub needs_saving: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    user: Option<User>,
    page: Page,
    module_completion: BTreeMap<WellnessModule, bool>,
    draft_responses: ShortFormResponses,
    snapshot: Option<ShortFormResult>,
    survey: WellbeingSurvey,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            user: None,
            page: Page::Overview,
            module_completion: WellnessModule::ALL.iter().map(|m| (*m, false)).collect(),
            draft_responses: ShortFormResponses::neutral(),
            snapshot: None,
            survey: WellbeingSurvey::default(),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn require_user(&self) -> Result<&User, SessionError> {
        self.user.as_ref().ok_or(SessionError::NotAuthenticated)
    }

    pub fn draft_responses(&self) -> &ShortFormResponses {
        &self.draft_responses
    }

    pub fn survey(&self) -> &WellbeingSurvey {
        &self.survey
    }

    pub fn snapshot(&self) -> Option<ShortFormResult> {
        self.snapshot
    }

    pub fn is_module_complete(&self, module: WellnessModule) -> bool {
        self.module_completion.get(&module).copied().unwrap_or(false)
    }

    pub fn all_modules_complete(&self) -> bool {
        WellnessModule::ALL.iter().all(|m| self.is_module_complete(*m))
    }

    /// First module still waiting to be completed.
    pub fn open_module(&self) -> Option<WellnessModule> {
        WellnessModule::ALL
            .into_iter()
            .find(|m| !self.is_module_complete(*m))
    }

    pub fn open_auth(&mut self) -> Result<Page, SessionError> {
        if self.is_authenticated() {
            return Err(SessionError::AlreadyAuthenticated);
        }
        self.expect_page("open the login page", &[Page::Overview])?;
        Ok(self.go(Page::Auth))
    }

    pub fn back_to_overview(&mut self) -> Result<Page, SessionError> {
        if self.is_authenticated() {
            return Err(SessionError::AlreadyAuthenticated);
        }
        self.expect_page("return to the overview", &[Page::Auth])?;
        Ok(self.go(Page::Overview))
    }

    pub fn log_in(&mut self, user: User) -> Result<Page, SessionError> {
        if self.is_authenticated() {
            return Err(SessionError::AlreadyAuthenticated);
        }
        self.expect_page("log in", &[Page::Auth])?;
        self.user = Some(user);
        Ok(self.go(Page::SelfCheck))
    }

    /// Clears authentication and per-user drafts. Stored history is untouched.
    pub fn log_out(&mut self) -> Result<Page, SessionError> {
        self.require_user()?;
        *self = Self::new();
        Ok(self.page)
    }

    /// Change one short-form answer. `item` is zero-based.
    pub fn set_answer(&mut self, item: usize, answer: i32) -> crate::error::Result<()> {
        self.expect_authenticated_page("answer the self-check", &[Page::SelfCheck])?;
        self.draft_responses.set(item, answer)?;
        self.snapshot = None;
        Ok(())
    }

    pub fn evaluate_self_check(&self) -> Result<SelfCheckSnapshot, SessionError> {
        self.expect_authenticated_page("take a snapshot", &[Page::SelfCheck])?;
        let result = risk::route(&self.draft_responses);
        Ok(SelfCheckSnapshot {
            result,
            needs_saving: self.snapshot != Some(result),
        })
    }

    /// Remember that `result` has been recorded for the current answers.
    pub fn confirm_snapshot(&mut self, result: ShortFormResult) -> Result<(), SessionError> {
        self.expect_authenticated_page("take a snapshot", &[Page::SelfCheck])?;
        self.snapshot = Some(result);
        Ok(())
    }

    pub fn follow_pathway(&mut self) -> Result<Page, SessionError> {
        self.expect_authenticated_page("choose a pathway", &[Page::SelfCheck])?;
        let snapshot = self.snapshot.ok_or(SessionError::NoSnapshot)?;
        let next = match snapshot.risk_level {
            crate::models::RiskLevel::High => Page::HighRiskPathway,
            crate::models::RiskLevel::Low => Page::LowRiskPathway,
        };
        Ok(self.go(next))
    }

    pub fn survey_mut(&mut self) -> Result<&mut WellbeingSurvey, SessionError> {
        self.expect_authenticated_page("edit the survey", &[Page::HighRiskPathway])?;
        Ok(&mut self.survey)
    }

    /// Apply a classifier outcome. Minimal risk moves the user to the
    /// low-risk pathway; flagged outcomes stay on the high-risk page.
    pub fn apply_prediction(&mut self, prediction: Prediction) -> Result<Page, SessionError> {
        self.expect_authenticated_page("analyze the survey", &[Page::HighRiskPathway])?;
        if prediction == Prediction::Minimal {
            return Ok(self.go(Page::LowRiskPathway));
        }
        Ok(self.page)
    }

    pub fn begin_modules(&mut self) -> Result<Page, SessionError> {
        self.expect_authenticated_page("begin the wellness modules", &[Page::LowRiskPathway])?;
        Ok(self.go(Page::LowRiskModules))
    }

    /// Check that `module` can be completed right now.
    pub fn ensure_module_open(&self, module: WellnessModule) -> Result<(), SessionError> {
        self.expect_authenticated_page("complete a module", &[Page::LowRiskModules])?;
        if self.is_module_complete(module) {
            return Err(SessionError::ModuleAlreadyComplete(module));
        }
        if let Some(required) = module.previous() {
            if !self.is_module_complete(required) {
                return Err(SessionError::ModuleLocked { module, required });
            }
        }
        Ok(())
    }

    pub fn complete_module(&mut self, module: WellnessModule) -> Result<(), SessionError> {
        self.ensure_module_open(module)?;
        self.module_completion.insert(module, true);
        Ok(())
    }

    pub fn open_dashboard(&mut self) -> Result<Page, SessionError> {
        self.expect_authenticated_page(
            "open the dashboard",
            &[Page::HighRiskPathway, Page::LowRiskModules],
        )?;
        if self.page == Page::LowRiskModules && !self.all_modules_complete() {
            return Err(SessionError::ModulesIncomplete);
        }
        Ok(self.go(Page::Dashboard))
    }

    fn go(&mut self, page: Page) -> Page {
        tracing::debug!(from = %self.page, to = %page, "page transition");
        self.page = page;
        page
    }

    fn expect_page(&self, action: &'static str, allowed: &[Page]) -> Result<(), SessionError> {
        if allowed.contains(&self.page) {
            Ok(())
        } else {
            Err(SessionError::NotAllowed {
                action,
                from: self.page,
            })
        }
    }

    fn expect_authenticated_page(
        &self,
        action: &'static str,
        allowed: &[Page],
    ) -> Result<(), SessionError> {
        self.require_user()?;
        self.expect_page(action, allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "kai".to_string(),
        }
    }

    fn logged_in() -> Session {
        let mut session = Session::new();
        session.open_auth().unwrap();
        session.log_in(user()).unwrap();
        session
    }

    fn snapshot_with(session: &mut Session, answer: i32) -> SelfCheckSnapshot {
        for item in 0..7 {
            session.set_answer(item, answer).unwrap();
        }
        let snapshot = session.evaluate_self_check().unwrap();
        session.confirm_snapshot(snapshot.result).unwrap();
        snapshot
    }

    #[test]
    fn cold_start_is_overview() {
        let session = Session::new();
        assert_eq!(session.page(), Page::Overview);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn unauthenticated_session_cannot_leave_overview_or_auth() {
        let mut session = Session::new();
        assert_eq!(session.follow_pathway(), Err(SessionError::NotAuthenticated));
        assert_eq!(session.open_dashboard(), Err(SessionError::NotAuthenticated));
        assert_eq!(session.begin_modules(), Err(SessionError::NotAuthenticated));
        assert!(session.set_answer(0, 3).is_err());
        assert_eq!(session.log_out(), Err(SessionError::NotAuthenticated));

        assert_eq!(session.open_auth().unwrap(), Page::Auth);
        assert_eq!(session.back_to_overview().unwrap(), Page::Overview);
    }

    #[test]
    fn login_lands_on_self_check() {
        let session = logged_in();
        assert_eq!(session.page(), Page::SelfCheck);
        assert_eq!(session.user().unwrap().username, "kai");
    }

    #[test]
    fn login_requires_auth_page() {
        let mut session = Session::new();
        assert!(matches!(
            session.log_in(user()),
            Err(SessionError::NotAllowed { from: Page::Overview, .. })
        ));
    }

    #[test]
    fn pathway_requires_snapshot() {
        let mut session = logged_in();
        assert_eq!(session.follow_pathway(), Err(SessionError::NoSnapshot));
    }

    #[test]
    fn low_scores_route_to_high_risk_pathway() {
        let mut session = logged_in();
        let snapshot = snapshot_with(&mut session, 2);
        assert_eq!(snapshot.result.risk_level, RiskLevel::High);
        assert_eq!(session.follow_pathway().unwrap(), Page::HighRiskPathway);
    }

    #[test]
    fn high_scores_route_to_low_risk_pathway() {
        let mut session = logged_in();
        snapshot_with(&mut session, 4);
        assert_eq!(session.follow_pathway().unwrap(), Page::LowRiskPathway);
        assert_eq!(session.begin_modules().unwrap(), Page::LowRiskModules);
    }

    #[test]
    fn snapshot_is_saved_once_per_answer_set() {
        let mut session = logged_in();
        let first = snapshot_with(&mut session, 4);
        assert!(first.needs_saving);

        let again = session.evaluate_self_check().unwrap();
        assert!(!again.needs_saving);

        session.set_answer(0, 5).unwrap();
        let changed = session.evaluate_self_check().unwrap();
        assert!(changed.needs_saving);
        assert_eq!(changed.result.total_score, 29);
    }

    #[test]
    fn modules_unlock_in_order() {
        let mut session = logged_in();
        snapshot_with(&mut session, 5);
        session.follow_pathway().unwrap();
        session.begin_modules().unwrap();

        assert_eq!(session.open_module(), Some(WellnessModule::Anxiety));
        assert_eq!(
            session.complete_module(WellnessModule::Gratitude),
            Err(SessionError::ModuleLocked {
                module: WellnessModule::Gratitude,
                required: WellnessModule::Anxiety,
            })
        );
        assert_eq!(session.open_dashboard(), Err(SessionError::ModulesIncomplete));

        for module in WellnessModule::ALL {
            session.complete_module(module).unwrap();
        }
        assert_eq!(
            session.complete_module(WellnessModule::Anxiety),
            Err(SessionError::ModuleAlreadyComplete(WellnessModule::Anxiety))
        );
        assert!(session.all_modules_complete());
        assert_eq!(session.open_dashboard().unwrap(), Page::Dashboard);
    }

    #[test]
    fn minimal_prediction_redirects_to_low_risk_pathway() {
        let mut session = logged_in();
        snapshot_with(&mut session, 1);
        session.follow_pathway().unwrap();

        assert_eq!(
            session.apply_prediction(Prediction::Severe).unwrap(),
            Page::HighRiskPathway
        );
        assert_eq!(
            session.apply_prediction(Prediction::Minimal).unwrap(),
            Page::LowRiskPathway
        );
    }

    #[test]
    fn high_risk_pathway_can_open_dashboard_any_time() {
        let mut session = logged_in();
        snapshot_with(&mut session, 1);
        session.follow_pathway().unwrap();
        session.survey_mut().unwrap().age = 22;
        assert_eq!(session.open_dashboard().unwrap(), Page::Dashboard);
    }

    #[test]
    fn dashboard_is_terminal_except_logout() {
        let mut session = logged_in();
        snapshot_with(&mut session, 1);
        session.follow_pathway().unwrap();
        session.open_dashboard().unwrap();

        assert!(session.open_dashboard().is_err());
        assert!(session.follow_pathway().is_err());
        assert!(session.begin_modules().is_err());
        assert!(session.apply_prediction(Prediction::Moderate).is_err());

        assert_eq!(session.log_out().unwrap(), Page::Overview);
        assert!(!session.is_authenticated());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn progress_counts_journey_steps() {
        assert_eq!(Page::Overview.progress_pct(), Some(16));
        assert_eq!(Page::SelfCheck.progress_pct(), Some(33));
        assert_eq!(Page::Dashboard.progress_pct(), Some(100));
        assert_eq!(Page::Auth.progress_pct(), None);
    }

    #[test]
    fn module_names_match_storage() {
        assert_eq!(WellnessModule::Gratitude.storage_name(), "Module 2");
        assert_eq!(WellnessModule::from_number(3), Some(WellnessModule::Wellness));
        assert_eq!(WellnessModule::from_number(4), None);
        assert_eq!(
            WellnessModule::question_for("Module 3"),
            WellnessModule::Wellness.question()
        );
        assert_eq!(WellnessModule::question_for("Module 9"), "Reflection Question");
    }
}
