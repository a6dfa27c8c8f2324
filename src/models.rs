use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STATUS_OPTIONS: [&str; 11] = [
    "Wishlist",
    "Draft",
    "Applied",
    "Online Assessment",
    "Phone Screen",
    "Interview",
    "Onsite/Final",
    "Offer",
    "Rejected",
    "Ghosted",
    "Paused",
];

pub const SOURCE_OPTIONS: [&str; 7] = [
    "Company Site",
    "LinkedIn",
    "Indeed",
    "Internal Portal",
    "Referral",
    "Career Fair",
    "Other",
];

pub const PRIORITY_OPTIONS: [&str; 3] = ["High", "Medium", "Low"];

/// Column names of the `applications` table, in schema order.
pub const COLUMNS: [&str; 15] = [
    "id",
    "company",
    "role_title",
    "location",
    "job_link",
    "source",
    "status",
    "deadline",
    "date_applied",
    "follow_up_date",
    "priority",
    "recruiter_name",
    "recruiter_email",
    "notes",
    "last_updated",
];

/// Columns that can be set to NULL by an edit.
pub const CLEARABLE_FIELDS: [&str; 11] = [
    "location",
    "job_link",
    "source",
    "status",
    "deadline",
    "date_applied",
    "follow_up_date",
    "priority",
    "recruiter_name",
    "recruiter_email",
    "notes",
];

/// One loosely-typed import row: column name to raw cell text.
pub type FieldMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub job_link: Option<String>,
    pub source: Option<String>, // one of SOURCE_OPTIONS when entered through the shell
    pub status: Option<String>, // one of STATUS_OPTIONS when entered through the shell
    pub deadline: Option<NaiveDate>,
    pub date_applied: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub priority: Option<String>, // "High", "Medium", "Low"
    pub recruiter_name: Option<String>,
    pub recruiter_email: Option<String>,
    pub notes: Option<String>,
    pub last_updated: Option<NaiveDateTime>,
}

/// Writable fields of a new application. `id` and `last_updated` are
/// assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub company: String,
    pub role_title: String,
    pub location: Option<String>,
    pub job_link: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub date_applied: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub recruiter_name: Option<String>,
    pub recruiter_email: Option<String>,
    pub notes: Option<String>,
}

impl NewApplication {
    pub fn new(company: impl Into<String>, role_title: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            role_title: role_title.into(),
            ..Default::default()
        }
    }
}

/// Partial update. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub company: Option<String>,
    pub role_title: Option<String>,
    pub location: Option<Option<String>>,
    pub job_link: Option<Option<String>>,
    pub source: Option<Option<String>>,
    pub status: Option<Option<String>>,
    pub deadline: Option<Option<NaiveDate>>,
    pub date_applied: Option<Option<NaiveDate>>,
    pub follow_up_date: Option<Option<NaiveDate>>,
    pub priority: Option<Option<String>>,
    pub recruiter_name: Option<Option<String>>,
    pub recruiter_email: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl ApplicationPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(Some(status.into())),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Marks a nullable column for clearing. Returns false for names that
    /// are not nullable columns.
    pub fn clear(&mut self, field: &str) -> bool {
        match field {
            "location" => self.location = Some(None),
            "job_link" => self.job_link = Some(None),
            "source" => self.source = Some(None),
            "status" => self.status = Some(None),
            "deadline" => self.deadline = Some(None),
            "date_applied" => self.date_applied = Some(None),
            "follow_up_date" => self.follow_up_date = Some(None),
            "priority" => self.priority = Some(None),
            "recruiter_name" => self.recruiter_name = Some(None),
            "recruiter_email" => self.recruiter_email = Some(None),
            "notes" => self.notes = Some(None),
            _ => return false,
        }
        true
    }
}

/// Filter options for listing applications. Options combine with AND; a
/// `None` or blank option imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationFilter {
    pub status: Option<String>,
    pub source: Option<String>,
    /// Case-insensitive substring of company or role title.
    pub search: Option<String>,
}

impl ApplicationFilter {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn matches_search(&self, app: &Application) -> bool {
        let Some(needle) = non_blank(self.search.as_deref()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        app.company.to_lowercase().contains(&needle)
            || app.role_title.to_lowercase().contains(&needle)
    }
}

/// Trims `value` and drops it when nothing is left.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Looks up the canonical spelling of `value` in `options`, ignoring case
/// and surrounding whitespace.
pub fn canonical_option(options: &[&'static str], value: &str) -> Option<&'static str> {
    let value = value.trim();
    options
        .iter()
        .copied()
        .find(|opt| opt.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(company: &str, role: &str) -> Application {
        Application {
            id: 1,
            company: company.to_string(),
            role_title: role.to_string(),
            location: None,
            job_link: None,
            source: None,
            status: None,
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
    fn search_matches_company_or_role_ignoring_case() {
        let filter = ApplicationFilter {
            search: Some("ACME".into()),
            ..Default::default()
        };
        assert!(filter.matches_search(&app("Acme Corp", "Engineer")));
        assert!(filter.matches_search(&app("Globex", "Acme liaison")));
        assert!(!filter.matches_search(&app("Globex", "Engineer")));
    }

    #[test]
    fn blank_search_matches_everything() {
        let filter = ApplicationFilter {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert!(filter.matches_search(&app("Globex", "Engineer")));
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let filter = ApplicationFilter {
            search: Some("ÉCOLE".into()),
            ..Default::default()
        };
        assert!(filter.matches_search(&app("école polytechnique", "TA")));
    }

    #[test]
    fn canonical_option_ignores_case() {
        assert_eq!(canonical_option(&STATUS_OPTIONS, "onsite/final"), Some("Onsite/Final"));
        assert_eq!(canonical_option(&SOURCE_OPTIONS, " linkedin "), Some("LinkedIn"));
        assert_eq!(canonical_option(&PRIORITY_OPTIONS, "urgent"), None);
    }

    #[test]
    fn clear_rejects_required_fields() {
        let mut patch = ApplicationPatch::default();
        assert!(!patch.clear("company"));
        assert!(!patch.clear("id"));
        assert!(patch.is_empty());
        assert!(patch.clear("deadline"));
        assert_eq!(patch.deadline, Some(None));
    }
}
