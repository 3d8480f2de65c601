//! Interactive session driven line by line from stdin.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::classifier::RiskClassifier;
use crate::clusters::ClusterTable;
use crate::config::Settings;
use crate::error::{CareError, Result};
use crate::features::SURVEY_FIELDS;
use crate::models::{Prediction, RiskLevel, User};
use crate::pipeline;
use crate::report;
use crate::session::{Page, Session, SessionError, WellnessModule};
use crate::store::CareStore;

const RECENT_CLUSTER_LIMIT: i64 = 2;

const THANKS: &str = "Thanks for opening up, even when things are hard. \
    You're not alone in this, and support is just a command away.";

/// Scene and prompt for each short-form item, in scoring order.
const SHORT_FORM_QUESTIONS: [(&str, &str); 7] = [
    (
        "Morning Routine in Dorm",
        "Another busy day ahead! But let's take a moment first. Have you been feeling \
         optimistic about how things are going in life and studies?",
    ),
    (
        "Rushing to Lecture",
        "Campus life is hectic, but have you felt useful or like your contributions matter, \
         whether in class, clubs, or helping friends?",
    ),
    (
        "Group Project Work",
        "When faced with choices, like how to manage your group or schedule, have you felt \
         confident making decisions?",
    ),
    (
        "Cafeteria Chat with Friends",
        "Social moments can be comforting. Lately, have you felt relaxed, even in social or \
         academic settings?",
    ),
    (
        "Solo Break Between Classes",
        "Let's be real, uni can be draining. But how have you felt about yourself overall? \
         Have you been feeling useful?",
    ),
    (
        "Club Meeting or Society Hangout",
        "Whether with flatmates, classmates, or society friends, have you felt close or \
         connected to others lately?",
    ),
    (
        "Evening Study or Journaling",
        "At the end of the day, when thinking through assignments or your own thoughts, \
         have you felt clear-headed?",
    ),
];

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Help,
    Quit,
    Logout,
    OpenLogin,
    Login { username: String, password: String },
    Signup { username: String, password: String },
    Back,
    Answer { question: usize, value: i32 },
    Snapshot,
    Continue,
    Set { field: String, value: String },
    Analyze,
    Begin,
    Complete { module: usize, reflection: String },
    Dashboard,
    Show,
}

fn parse_action(line: &str) -> std::result::Result<Action, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let number = |raw: Option<&&str>, what: &str| -> std::result::Result<i64, String> {
        raw.ok_or_else(|| format!("missing {what}"))?
            .parse::<i64>()
            .map_err(|_| format!("{what} must be a number"))
    };

    match (verb.as_str(), args.as_slice()) {
        ("help", _) => Ok(Action::Help),
        ("quit" | "exit", _) => Ok(Action::Quit),
        ("logout", _) => Ok(Action::Logout),
        ("login", []) => Ok(Action::OpenLogin),
        ("login", [username, password]) => Ok(Action::Login {
            username: username.to_string(),
            password: password.to_string(),
        }),
        ("signup", [username, password]) => Ok(Action::Signup {
            username: username.to_string(),
            password: password.to_string(),
        }),
        ("login" | "signup", _) => Err(format!("usage: {verb} <username> <password>")),
        ("back", _) => Ok(Action::Back),
        ("answer", _) => {
            let question = number(args.first(), "question number")?;
            let value = number(args.get(1), "answer")?;
            if question < 1 {
                return Err("questions are numbered from 1".to_string());
            }
            Ok(Action::Answer {
                question: question as usize,
                value: i32::try_from(value).map_err(|_| "answer out of range".to_string())?,
            })
        }
        ("snapshot", _) => Ok(Action::Snapshot),
        ("continue", _) => Ok(Action::Continue),
        ("set", [field, value]) => Ok(Action::Set {
            field: field.to_string(),
            value: value.to_string(),
        }),
        ("set", _) => Err(format!("usage: set <{}> <value>", SURVEY_FIELDS.join("|"))),
        ("analyze", _) => Ok(Action::Analyze),
        ("begin", _) => Ok(Action::Begin),
        ("complete", _) => {
            let module = number(args.first(), "module number")?;
            Ok(Action::Complete {
                module: usize::try_from(module).map_err(|_| "unknown module".to_string())?,
                reflection: args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default(),
            })
        }
        ("dashboard", _) => Ok(Action::Dashboard),
        ("show", _) => Ok(Action::Show),
        (other, _) => Err(format!("unknown command '{other}', try 'help'")),
    }
}

/// Drives one `Session` from typed commands. Output is buffered per action
/// and flushed by `run`, so a failing action shows everything it said before
/// the error.
pub struct Walkthrough<'a, S> {
    store: S,
    settings: &'a Settings,
    session: Session,
    transcript: Vec<String>,
}

impl<'a, S: CareStore> Walkthrough<'a, S> {
    pub fn new(store: S, settings: &'a Settings) -> Self {
        Self {
            store,
            settings,
            session: Session::new(),
            transcript: Vec::new(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.render_page();
        self.flush();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let action = match parse_action(line) {
                Ok(Action::Quit) => break,
                Ok(action) => action,
                Err(usage) => {
                    println!("{usage}");
                    continue;
                }
            };

            let before = self.session.page();
            let outcome = self.handle(action).await;
            self.flush();
            match outcome {
                Err(err) => {
                    tracing::warn!(category = err.category(), error = %err, "action failed");
                    println!("Error: {err}");
                }
                Ok(()) if self.session.page() != before => {
                    self.render_page();
                    self.flush();
                }
                Ok(()) => {}
            }
        }

        println!("Goodbye. Take care of yourself.");
        Ok(())
    }

    fn say(&mut self, text: impl Into<String>) {
        self.transcript.push(text.into());
    }

    fn flush(&mut self) {
        for text in self.transcript.drain(..) {
            println!("{}", text.trim_end_matches('\n'));
        }
    }

    async fn handle(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Help | Action::Quit => self.print_help(),
            Action::Logout => {
                self.session.log_out()?;
                self.say("You have been logged out.");
            }
            Action::OpenLogin => {
                self.session.open_auth()?;
            }
            Action::Back => {
                self.session.back_to_overview()?;
            }
            Action::Signup { username, password } => {
                self.expect_page("sign up", Page::Auth)?;
                self.store.sign_up(&username, &password).await?;
                self.say("Account created. Please log in.");
            }
            Action::Login { username, password } => {
                self.expect_page("log in", Page::Auth)?;
                let user = self.store.log_in(&username, &password).await?;
                self.session.log_in(user)?;
                self.say("Login successful!");
            }
            Action::Answer { question, value } => {
                self.session.set_answer(question - 1, value)?;
                self.say(format!("Q{question} = {value}"));
            }
            Action::Snapshot => self.take_snapshot().await?,
            Action::Continue => {
                self.session.follow_pathway()?;
            }
            Action::Set { field, value } => {
                let survey = self.session.survey_mut()?;
                let mut edited = survey.clone();
                edited.set_field(&field, &value)?;
                edited.validate()?;
                *survey = edited;
                self.say(format!("{field} = {value}"));
            }
            Action::Analyze => self.analyze().await?,
            Action::Begin => {
                self.session.begin_modules()?;
            }
            Action::Complete { module, reflection } => {
                self.complete_module(module, &reflection).await?
            }
            Action::Dashboard => {
                self.session.open_dashboard()?;
                self.print_dashboard().await?;
            }
            Action::Show => {
                self.expect_page("show the dashboard", Page::Dashboard)?;
                self.print_dashboard().await?;
            }
        }
        Ok(())
    }

    async fn take_snapshot(&mut self) -> Result<()> {
        let snapshot = self.session.evaluate_self_check()?;
        if snapshot.needs_saving {
            let user_id = self.session.require_user()?.id;
            self.store
                .save_self_check_visit(user_id, &snapshot.result)
                .await?;
            self.session.confirm_snapshot(snapshot.result)?;
        }

        let result = snapshot.result;
        self.say(format!("Your Total Score: {} / 35", result.total_score));
        match result.risk_level {
            RiskLevel::High => {
                self.say("High-Risk Pathway");
                self.say(
                    "You might benefit from additional support. \
                     Type 'continue' to explore helpful resources.",
                );
            }
            RiskLevel::Low => {
                self.say("Low-Risk Pathway");
                self.say(
                    "You're showing strong signs of wellbeing. \
                     Type 'continue' to keep the momentum going.",
                );
            }
        }
        Ok(())
    }

    /// Loads the artifacts fresh for every submission.
    async fn analyze(&mut self) -> Result<()> {
        let classifier = self.settings.classifier()?;
        let table = self.settings.cluster_table()?;
        self.record_assessment(&classifier, &table).await
    }

    async fn record_assessment(
        &mut self,
        classifier: &dyn RiskClassifier,
        table: &ClusterTable,
    ) -> Result<()> {
        let survey = self.session.survey_mut()?.clone();
        let user_id = self.session.require_user()?.id;
        let assessment = pipeline::assess(&survey, classifier, table)?;

        self.say(format!(
            "Check-in result: {}",
            assessment.prediction.headline()
        ));
        match assessment.prediction {
            Prediction::Minimal => {
                self.say(
                    "You're showing early signs, but you're managing well. \
                     Keep checking in with yourself!",
                );
                self.say("Redirecting you to the Low-Risk Wellness Pathway.");
            }
            Prediction::Moderate => {
                self.say(
                    "There are some warning signs. \
                     You might benefit from support circles or peer check-ins.",
                );
            }
            Prediction::Severe => {
                self.say(
                    "I'm concerned about your well-being. You're not alone. \
                     Let's explore support options together.",
                );
            }
        }

        if let Some(cluster) = &assessment.cluster {
            self.say(format!(
                "Assigned to Cluster: {} ({})",
                cluster.cluster, cluster.group
            ));
            if let Some(profile) = table.profile(cluster.group.as_str(), cluster.cluster) {
                self.say(report::describe_profile(profile));
            }

            self.store
                .save_high_risk_response(user_id, &survey, assessment.prediction, cluster.cluster)
                .await?;
            self.say(THANKS);
        }

        self.session.apply_prediction(assessment.prediction)?;
        Ok(())
    }

    async fn complete_module(&mut self, number: usize, reflection: &str) -> Result<()> {
        let module = WellnessModule::from_number(number)
            .ok_or_else(|| CareError::integrity(format!("module {number} does not exist")))?;
        self.session.ensure_module_open(module)?;

        let text = reflection.trim();
        if !text.is_empty() {
            let user_id = self.session.require_user()?.id;
            self.store
                .save_reflection(user_id, &module.storage_name(), text)
                .await?;
        }
        self.session.complete_module(module)?;
        self.say(format!("{module} complete."));

        match self.session.open_module() {
            Some(next) => self.print_module(next),
            None => self.say("All modules completed! Type 'dashboard' to open your dashboard."),
        }
        Ok(())
    }

    async fn print_dashboard(&mut self) -> Result<()> {
        let user = self.session.require_user()?;
        let dashboard = render_dashboard(&self.store, self.settings, user).await?;
        self.say(dashboard);
        Ok(())
    }

    fn expect_page(&self, action: &'static str, page: Page) -> Result<()> {
        if self.session.page() != page {
            return Err(SessionError::NotAllowed {
                action,
                from: self.session.page(),
            }
            .into());
        }
        Ok(())
    }

    fn render_page(&mut self) {
        let page = self.session.page();
        self.say("");
        let header = match (self.session.user(), page.progress_pct()) {
            (Some(user), Some(pct)) => {
                format!("[{}] {page} ({pct}% of your journey)", user.username)
            }
            _ => format!("[{page}]"),
        };
        self.say(header);

        match page {
            Page::Overview => {
                self.say(
                    "Campus Care: check in on your wellbeing, explore a pathway that fits, \
                     and track your progress.",
                );
                self.say("Type 'login' to log in or sign up.");
            }
            Page::Auth => {
                self.say("Type 'login <user> <pass>', 'signup <user> <pass>' or 'back'.");
            }
            Page::SelfCheck => {
                self.say("Rate each question from 1 (none of the time) to 5 (all of the time).");
                let answers = *self.session.draft_responses().answers();
                for (idx, ((scene, prompt), answer)) in
                    SHORT_FORM_QUESTIONS.iter().zip(answers).enumerate()
                {
                    self.say(format!("  Q{} {scene}: {prompt} [{answer}]", idx + 1));
                }
                self.say("Type 'answer <q> <1-5>', then 'snapshot'.");
            }
            Page::HighRiskPathway => {
                self.say("These questions help us understand what you're going through.");
                let survey = self.session.survey().clone();
                self.say(format!(
                    "  age {}, study_hours {}, academic_workload {}, coursework_pressure {}, \
                     sleep_hours {:.1}",
                    survey.age,
                    survey.study_hours_per_week,
                    survey.academic_workload,
                    survey.coursework_pressure,
                    survey.sleep_hours_per_night
                ));
                self.say(format!(
                    "  physical_activity {}, financial_stress {}, cocurricular {}, isolation {}, \
                     suicidal_thoughts {}",
                    survey.physical_activity,
                    survey.financial_stress,
                    survey.cocurricular_involvement,
                    survey.isolation,
                    if survey.suicidal_thoughts { "yes" } else { "no" }
                ));
                self.say(format!(
                    "Type 'set <field> <value>' ({}), then 'analyze'. \
                     'dashboard' leaves at any time.",
                    SURVEY_FIELDS.join(", ")
                ));
            }
            Page::LowRiskPathway => {
                self.say(
                    "Your wellbeing appears to be in a positive range. \
                     Short awareness modules are waiting for you.",
                );
                self.say("Type 'begin' to start the wellness modules.");
            }
            Page::LowRiskModules => match self.session.open_module() {
                Some(module) => self.print_module(module),
                None => self.say("All modules completed! Type 'dashboard'."),
            },
            Page::Dashboard => {
                self.say("Type 'show' to refresh your dashboard or 'logout' to finish.");
            }
        }
    }

    fn print_module(&mut self, module: WellnessModule) {
        self.say(format!("{module}: {}", module.title()));
        self.say(format!("Reflection: {}", module.question()));
        self.say(format!(
            "Type 'complete {} [your reflection]'.",
            module.number()
        ));
    }

    fn print_help(&mut self) {
        self.say(
            "Commands: login, signup, back, answer, snapshot, continue, set, analyze, begin, \
             complete, dashboard, show, logout, quit",
        );
        self.render_page();
    }
}

pub async fn render_dashboard<S: CareStore + ?Sized>(
    store: &S,
    settings: &Settings,
    user: &User,
) -> Result<String> {
    let table = settings.cluster_table()?;
    let stats = store.self_check_stats(user.id).await?;
    let clusters = store
        .recent_clusters(&table, user.id, RECENT_CLUSTER_LIMIT)
        .await?;
    let reflections = store.latest_reflections(user.id).await?;
    Ok(report::build_dashboard(
        &user.username,
        &stats,
        &clusters,
        &reflections,
    ))
}
