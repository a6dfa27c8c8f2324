//! Dashboard computations over a snapshot of applications.
//!
//! Everything here is a pure function of its inputs. Callers pass `today`
//! explicitly; the shell uses the local calendar date.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::Application;

pub const UPCOMING_WINDOW_DAYS: u64 = 7;
pub const DEFAULT_RECIPIENT: &str = "Hiring Team";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub applied: usize,
    pub interviews: usize,
    pub offers: usize,
}

impl Summary {
    pub fn from_records(apps: &[Application]) -> Self {
        let with_status = |wanted: &[&str]| {
            apps.iter()
                .filter(|a| a.status.as_deref().is_some_and(|s| wanted.contains(&s)))
                .count()
        };
        Self {
            total: apps.len(),
            applied: with_status(&["Applied"]),
            interviews: with_status(&["Interview", "Onsite/Final"]),
            offers: with_status(&["Offer"]),
        }
    }
}

/// Number of applications per distinct status, largest first. Records
/// without a status are not counted.
pub fn status_counts(apps: &[Application]) -> Vec<StatusCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for status in apps.iter().filter_map(|a| a.status.as_deref()) {
        *counts.entry(status).or_default() += 1;
    }

    let mut counts: Vec<StatusCount> = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    counts
}

/// Applications whose deadline falls in `[today, today + 7 days]`.
pub fn upcoming_deadlines(apps: &[Application], today: NaiveDate) -> Vec<&Application> {
    let end = today
        .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MAX);
    apps.iter()
        .filter(|a| a.deadline.is_some_and(|d| today <= d && d <= end))
        .collect()
}

pub fn due_follow_ups(apps: &[Application], today: NaiveDate) -> Vec<&Application> {
    apps.iter()
        .filter(|a| a.follow_up_date == Some(today))
        .collect()
}

/// Renders the follow-up email for one application. `recipient` overrides
/// the stored recruiter name.
pub fn follow_up_message(app: &Application, recipient: Option<&str>) -> String {
    let recipient = recipient
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .or(app.recruiter_name.as_deref())
        .unwrap_or(DEFAULT_RECIPIENT);
    let applied_on = app
        .date_applied
        .map(|d| d.to_string())
        .unwrap_or_else(|| "recently".to_string());

    format!(
        "Hi {recipient},

I hope you're well. I applied for the {role} position at {company} on {applied_on} and wanted to kindly follow up on my application. I'm very excited about the role and how my skills align with your team.

If there are any updates or next steps I can prepare for, please let me know. Thanks for your time!

Best regards,
[Your Name]
[Phone] | [LinkedIn]
",
        role = app.role_title,
        company = app.company,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn app(id: i64, status: Option<&str>) -> Application {
        Application {
            id,
            company: "Acme".to_string(),
            role_title: "Engineer".to_string(),
            location: None,
            job_link: None,
            source: None,
            status: status.map(str::to_string),
            deadline: None,
            date_applied: None,
            follow_up_date: None,
            priority: None,
            recruiter_name: None,
            recruiter_email: None,
            notes: None,
            last_updated: None,
        }
    }

    #[test]
    fn status_counts_group_and_sort() {
        let apps = vec![
            app(1, Some("Applied")),
            app(2, Some("Offer")),
            app(3, Some("Applied")),
            app(4, None),
            app(5, Some("Ghosted")),
        ];
        let counts = status_counts(&apps);
        assert_eq!(
            counts,
            vec![
                StatusCount { status: "Applied".into(), count: 2 },
                StatusCount { status: "Ghosted".into(), count: 1 },
                StatusCount { status: "Offer".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn summary_groups_interview_stages() {
        let apps = vec![
            app(1, Some("Applied")),
            app(2, Some("Interview")),
            app(3, Some("Onsite/Final")),
            app(4, Some("Offer")),
            app(5, None),
        ];
        assert_eq!(
            Summary::from_records(&apps),
            Summary { total: 5, applied: 1, interviews: 2, offers: 1 }
        );
    }

    #[test]
    fn upcoming_window_is_inclusive() {
        let today = date(2024, 6, 10);
        let mut apps = Vec::new();
        for (id, deadline) in [
            (1, Some(date(2024, 6, 9))),
            (2, Some(date(2024, 6, 10))),
            (3, Some(date(2024, 6, 17))),
            (4, Some(date(2024, 6, 18))),
            (5, None),
        ] {
            let mut a = app(id, None);
            a.deadline = deadline;
            apps.push(a);
        }
        let ids: Vec<i64> = upcoming_deadlines(&apps, today).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn follow_ups_due_exactly_today() {
        let today = date(2024, 6, 10);
        let mut due = app(1, None);
        due.follow_up_date = Some(today);
        let mut later = app(2, None);
        later.follow_up_date = Some(date(2024, 6, 11));
        let apps = vec![due, later, app(3, None)];
        let ids: Vec<i64> = due_follow_ups(&apps, today).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn message_uses_defaults() {
        let msg = follow_up_message(&app(1, None), None);
        assert!(msg.starts_with("Hi Hiring Team,"));
        assert!(msg.contains("the Engineer position at Acme on recently"));
    }

    #[test]
    fn message_prefers_override_then_recruiter() {
        let mut a = app(1, None);
        a.recruiter_name = Some("Jane Doe".into());
        a.date_applied = Some(date(2024, 5, 2));
        assert!(follow_up_message(&a, None).starts_with("Hi Jane Doe,"));
        assert!(follow_up_message(&a, None).contains("on 2024-05-02 and"));
        assert!(follow_up_message(&a, Some("Sam")).starts_with("Hi Sam,"));
        assert!(follow_up_message(&a, Some("  ")).starts_with("Hi Jane Doe,"));
    }
}
