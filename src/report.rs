use std::collections::BTreeMap;
use std::fmt::Write;

use crate::clusters::ClusterProfile;
use crate::features::PROFILE_FEATURES;
use crate::models::{LatestReflection, RecentCluster, SelfCheckStats};
use crate::session::WellnessModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    StressFreeChamp,
    RiskAlertExplorer,
    BalancedTracker,
    CalmResponder,
    HighRiskWatcher,
    MixedJourneyExplorer,
}

impl Badge {
    pub fn title(&self) -> &'static str {
        match self {
            Badge::StressFreeChamp => "Stress-Free Champ",
            Badge::RiskAlertExplorer => "Risk Alert Explorer",
            Badge::BalancedTracker => "Balanced Tracker",
            Badge::CalmResponder => "Calm Responder",
            Badge::HighRiskWatcher => "High Risk Watcher",
            Badge::MixedJourneyExplorer => "Mixed Journey Explorer",
        }
    }

    pub fn blurb(&self) -> &'static str {
        match self {
            Badge::StressFreeChamp => {
                "Every check-in so far landed in the low-risk range. Keep it up!"
            }
            Badge::RiskAlertExplorer => {
                "All of your check-ins showed high stress. \
                 Checking in during tough moments is a powerful first step."
            }
            Badge::BalancedTracker => {
                "You have kept a near-equal mix of high and low-risk check-ins. Keep it steady!"
            }
            Badge::CalmResponder => "Most of your check-ins show calm and clarity under pressure.",
            Badge::HighRiskWatcher => {
                "Most of your check-ins show high stress. Support is always a click away."
            }
            Badge::MixedJourneyExplorer => "Your check-ins tell a varied story. Keep exploring.",
        }
    }
}

/// Badge for a user's check-in history. The first matching rule wins.
pub fn award_badge(stats: &SelfCheckStats) -> Option<Badge> {
    let SelfCheckStats { total, low, high } = *stats;
    if total <= 0 {
        return None;
    }

    let low_ratio = low as f64 / total as f64;
    let high_ratio = high as f64 / total as f64;

    let badge = if low == total {
        Badge::StressFreeChamp
    } else if high == total {
        Badge::RiskAlertExplorer
    } else if (low - high).abs() <= 1 && total >= 2 {
        Badge::BalancedTracker
    } else if low_ratio >= 0.7 {
        Badge::CalmResponder
    } else if high_ratio >= 0.7 {
        Badge::HighRiskWatcher
    } else {
        Badge::MixedJourneyExplorer
    };
    Some(badge)
}

pub fn build_dashboard(
    username: &str,
    stats: &SelfCheckStats,
    clusters: &[RecentCluster],
    reflections: &BTreeMap<String, LatestReflection>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Wellness Dashboard for {username}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Check-Ins");
    let _ = writeln!(output, "- Total check-ins: {}", stats.total);
    let _ = writeln!(output, "- Low-risk sessions: {}", stats.low);
    let _ = writeln!(output, "- High-risk sessions: {}", stats.high);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent High-Risk Clusters");
    if clusters.is_empty() {
        let _ = writeln!(output, "All check-ins are low risk!");
    } else {
        for cluster in clusters {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                cluster.label,
                cluster.date.format("%Y-%m-%d"),
                cluster.description
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Badge");
    match award_badge(stats) {
        Some(badge) => {
            let _ = writeln!(output, "**{}**: {}", badge.title(), badge.blurb());
        }
        None => {
            let _ = writeln!(output, "Complete a check-in to start earning badges!");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Reflections from Wellness Modules");
    if reflections.is_empty() {
        let _ = writeln!(output, "You haven't submitted any reflections yet.");
    } else {
        for (module_name, reflection) in reflections {
            let _ = writeln!(output, "### {}", WellnessModule::question_for(module_name));
            let _ = writeln!(output, "> {}", reflection.text);
            let _ = writeln!(
                output,
                "Submitted on {}",
                reflection.created_at.format("%Y-%m-%d")
            );
            let _ = writeln!(output);
        }
    }

    output
}

/// One line per profile plus its normalized center.
pub fn describe_profile(profile: &ClusterProfile) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} cluster {}: {}",
        profile.group, profile.cluster, profile.name
    );
    let _ = writeln!(output, "  {}", profile.description);
    for (feature, value) in PROFILE_FEATURES.iter().zip(profile.center.values()) {
        let _ = writeln!(output, "  {feature:<26} {value:.2}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn stats(total: i64, low: i64, high: i64) -> SelfCheckStats {
        SelfCheckStats { total, low, high }
    }

    #[test]
    fn no_history_earns_no_badge() {
        assert_eq!(award_badge(&stats(0, 0, 0)), None);
    }

    #[test]
    fn uniform_histories_win_first() {
        assert_eq!(award_badge(&stats(1, 1, 0)), Some(Badge::StressFreeChamp));
        assert_eq!(award_badge(&stats(4, 0, 4)), Some(Badge::RiskAlertExplorer));
    }

    #[test]
    fn near_equal_mix_is_balanced() {
        assert_eq!(award_badge(&stats(2, 1, 1)), Some(Badge::BalancedTracker));
        assert_eq!(award_badge(&stats(5, 3, 2)), Some(Badge::BalancedTracker));
    }

    #[test]
    fn ratios_decide_the_rest() {
        assert_eq!(award_badge(&stats(10, 7, 3)), Some(Badge::CalmResponder));
        assert_eq!(award_badge(&stats(10, 2, 8)), Some(Badge::HighRiskWatcher));
        assert_eq!(award_badge(&stats(10, 6, 4)), Some(Badge::MixedJourneyExplorer));
    }

    #[test]
    fn dashboard_lists_clusters_and_reflections() {
        let clusters = vec![RecentCluster {
            label: "The Drifting Observer".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            description: "Disengaged".to_string(),
        }];
        let mut reflections = BTreeMap::new();
        reflections.insert(
            "Module 2".to_string(),
            LatestReflection {
                text: "My flatmates".to_string(),
                created_at: Utc.with_ymd_and_hms(2026, 3, 5, 9, 0, 0).unwrap(),
            },
        );

        let dashboard = build_dashboard("kai", &stats(3, 1, 2), &clusters, &reflections);
        assert!(dashboard.contains("# Wellness Dashboard for kai"));
        assert!(dashboard.contains("- Total check-ins: 3"));
        assert!(dashboard.contains("- The Drifting Observer (2026-03-04): Disengaged"));
        assert!(dashboard.contains("**Balanced Tracker**"));
        assert!(dashboard.contains(WellnessModule::Gratitude.question()));
        assert!(dashboard.contains("> My flatmates"));
        assert!(dashboard.contains("Submitted on 2026-03-05"));
    }

    #[test]
    fn empty_dashboard_has_friendly_placeholders() {
        let dashboard = build_dashboard("kai", &stats(0, 0, 0), &[], &BTreeMap::new());
        assert!(dashboard.contains("All check-ins are low risk!"));
        assert!(dashboard.contains("Complete a check-in to start earning badges!"));
        assert!(dashboard.contains("You haven't submitted any reflections yet."));
    }
}
