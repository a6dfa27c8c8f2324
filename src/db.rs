use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{non_blank, Application, ApplicationFilter, ApplicationPatch, FieldMap, NewApplication};

/// Storage format of `last_updated`. Fixed width so that text order is
/// chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_SQL: &str = "SELECT id, company, role_title, location, job_link, source, status,
        deadline, date_applied, follow_up_date, priority, recruiter_name,
        recruiter_email, notes, last_updated
 FROM applications";

const INSERT_SQL: &str = "INSERT INTO applications (
        company, role_title, location, job_link, source, status,
        deadline, date_applied, follow_up_date, priority, recruiter_name,
        recruiter_email, notes, last_updated
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} is required")]
    Validation { field: &'static str },

    #[error("application #{0} not found")]
    NotFound(i64),

    #[error("import failed: {0}")]
    Import(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle to the application store. Holds only the file path: every
/// operation opens its own connection and closes it before returning.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
            proj_dirs.data_dir().join("apptrack.db")
        } else {
            PathBuf::from("apptrack.db")
        }
    }

    fn connect(&self) -> StoreResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Creates the schema if it does not exist yet. Safe to call on every start.
    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                role_title TEXT NOT NULL,
                location TEXT,
                job_link TEXT,
                source TEXT,
                status TEXT,
                deadline TEXT,
                date_applied TEXT,
                follow_up_date TEXT,
                priority TEXT,
                recruiter_name TEXT,
                recruiter_email TEXT,
                notes TEXT,
                last_updated TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
            CREATE INDEX IF NOT EXISTS idx_applications_source ON applications(source);
            "#,
        )?;
        debug!(path = %self.path.display(), "schema ready");
        Ok(())
    }

    // --- Application operations ---

    pub fn create(&self, app: &NewApplication) -> StoreResult<i64> {
        let company = required("company", &app.company)?;
        let role_title = required("role_title", &app.role_title)?;

        let conn = self.connect()?;
        conn.execute(
            INSERT_SQL,
            params![
                company,
                role_title,
                non_blank(app.location.as_deref()),
                non_blank(app.job_link.as_deref()),
                non_blank(app.source.as_deref()),
                non_blank(app.status.as_deref()),
                app.deadline.map(format_date),
                app.date_applied.map(format_date),
                app.follow_up_date.map(format_date),
                non_blank(app.priority.as_deref()),
                non_blank(app.recruiter_name.as_deref()),
                non_blank(app.recruiter_email.as_deref()),
                non_blank(app.notes.as_deref()),
                now_timestamp(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        info!(id, company, role_title, "created application");
        Ok(id)
    }

    /// Lists applications matching `filter`, most recently updated first.
    /// Rows without `last_updated` come last; ties break on id, newest first.
    pub fn read(&self, filter: &ApplicationFilter) -> StoreResult<Vec<Application>> {
        let mut sql = format!("{SELECT_SQL} WHERE 1=1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = non_blank(filter.status.as_deref()) {
            bind_values.push(Value::Text(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", bind_values.len()));
        }

        if let Some(source) = non_blank(filter.source.as_deref()) {
            bind_values.push(Value::Text(source.to_string()));
            sql.push_str(&format!(" AND source = ?{}", bind_values.len()));
        }

        sql.push_str(" ORDER BY last_updated DESC NULLS LAST, id DESC");

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), row_to_application)?;

        // Search runs here rather than in SQL: LIKE only folds ASCII case.
        let mut apps = Vec::new();
        for row in rows {
            let app = row?;
            if filter.matches_search(&app) {
                apps.push(app);
            }
        }

        debug!(count = apps.len(), "listed applications");
        Ok(apps)
    }

    pub fn get(&self, id: i64) -> StoreResult<Option<Application>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            &format!("{SELECT_SQL} WHERE id = ?1"),
            [id],
            row_to_application,
        );
        match result {
            Ok(app) => Ok(Some(app)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies the fields present in `patch` and refreshes `last_updated`.
    pub fn update(&self, id: i64, patch: &ApplicationPatch) -> StoreResult<()> {
        let mut assignments = Assignments::default();

        if let Some(company) = &patch.company {
            let company = required("company", company)?;
            assignments.set("company", Value::Text(company.to_string()));
        }
        if let Some(role_title) = &patch.role_title {
            let role_title = required("role_title", role_title)?;
            assignments.set("role_title", Value::Text(role_title.to_string()));
        }
        assignments.text("location", &patch.location);
        assignments.text("job_link", &patch.job_link);
        assignments.text("source", &patch.source);
        assignments.text("status", &patch.status);
        assignments.date("deadline", &patch.deadline);
        assignments.date("date_applied", &patch.date_applied);
        assignments.date("follow_up_date", &patch.follow_up_date);
        assignments.text("priority", &patch.priority);
        assignments.text("recruiter_name", &patch.recruiter_name);
        assignments.text("recruiter_email", &patch.recruiter_email);
        assignments.text("notes", &patch.notes);

        let Assignments { columns, mut values } = assignments;
        let mut clauses: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ?{}", i + 1))
            .collect();

        // Never move last_updated backwards, even if the clock does.
        values.push(Value::Text(now_timestamp()));
        let now_idx = values.len();
        clauses.push(format!(
            "last_updated = MAX(COALESCE(last_updated, ?{now_idx}), ?{now_idx})"
        ));

        values.push(Value::Integer(id));
        let sql = format!(
            "UPDATE applications SET {} WHERE id = ?{}",
            clauses.join(", "),
            values.len()
        );

        let conn = self.connect()?;
        let changed = conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        info!(id, fields = ?columns, "updated application");
        Ok(())
    }

    pub fn delete(&self, id: i64) -> StoreResult<()> {
        let conn = self.connect()?;
        let changed = conn.execute("DELETE FROM applications WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        info!(id, "deleted application");
        Ok(())
    }

    /// Inserts one new application per row inside a single transaction.
    ///
    /// Keys are matched trimmed and case-insensitively against the column
    /// names; unknown keys (including `id`) are ignored and missing columns
    /// are stored as NULL. `last_updated` is kept as given. Any bad row or
    /// write failure rejects the whole batch.
    pub fn bulk_import(&self, rows: &[FieldMap]) -> StoreResult<usize> {
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                parse_import_row(row).map_err(|reason| {
                    warn!(row = i + 1, %reason, "rejected import row");
                    StoreError::Import(format!("row {}: {reason}", i + 1))
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(import_failed)?;
        {
            let mut stmt = tx.prepare(INSERT_SQL).map_err(import_failed)?;
            for (app, last_updated) in &records {
                stmt.execute(params![
                    app.company,
                    app.role_title,
                    app.location,
                    app.job_link,
                    app.source,
                    app.status,
                    app.deadline.map(format_date),
                    app.date_applied.map(format_date),
                    app.follow_up_date.map(format_date),
                    app.priority,
                    app.recruiter_name,
                    app.recruiter_email,
                    app.notes,
                    last_updated.map(format_timestamp),
                ])
                .map_err(import_failed)?;
            }
        }
        tx.commit().map_err(import_failed)?;

        info!(count = records.len(), "imported applications");
        Ok(records.len())
    }
}

#[derive(Default)]
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    fn set(&mut self, column: &'static str, value: Value) {
        self.columns.push(column);
        self.values.push(value);
    }

    fn text(&mut self, column: &'static str, value: &Option<Option<String>>) {
        if let Some(value) = value {
            let value = match non_blank(value.as_deref()) {
                Some(text) => Value::Text(text.to_string()),
                None => Value::Null,
            };
            self.set(column, value);
        }
    }

    fn date(&mut self, column: &'static str, value: &Option<Option<NaiveDate>>) {
        if let Some(value) = value {
            let value = match value {
                Some(date) => Value::Text(format_date(*date)),
                None => Value::Null,
            };
            self.set(column, value);
        }
    }
}

fn row_to_application(row: &Row) -> rusqlite::Result<Application> {
    Ok(Application {
        id: row.get(0)?,
        company: row.get(1)?,
        role_title: row.get(2)?,
        location: row.get(3)?,
        job_link: row.get(4)?,
        source: row.get(5)?,
        status: row.get(6)?,
        deadline: row.get(7)?,
        date_applied: row.get(8)?,
        follow_up_date: row.get(9)?,
        priority: row.get(10)?,
        recruiter_name: row.get(11)?,
        recruiter_email: row.get(12)?,
        notes: row.get(13)?,
        last_updated: row.get(14)?,
    })
}

fn required<'a>(field: &'static str, value: &'a str) -> StoreResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Validation { field });
    }
    Ok(value)
}

fn import_failed(err: rusqlite::Error) -> StoreError {
    warn!(error = %err, "import batch rolled back");
    StoreError::Import(err.to_string())
}

fn parse_import_row(row: &FieldMap) -> Result<(NewApplication, Option<NaiveDateTime>), String> {
    let fields: HashMap<String, &str> = row
        .iter()
        .map(|(key, value)| (key.trim().to_lowercase(), value.as_str()))
        .collect();

    let cell = |name: &str| non_blank(fields.get(name).copied());
    let text = |name: &str| cell(name).map(str::to_string);
    let date = |name: &str| match cell(name) {
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| format!("{name}: invalid date '{raw}'")),
        None => Ok(None),
    };

    let app = NewApplication {
        company: text("company").ok_or_else(|| "company is required".to_string())?,
        role_title: text("role_title").ok_or_else(|| "role_title is required".to_string())?,
        location: text("location"),
        job_link: text("job_link"),
        source: text("source"),
        status: text("status"),
        deadline: date("deadline")?,
        date_applied: date("date_applied")?,
        follow_up_date: date("follow_up_date")?,
        priority: text("priority"),
        recruiter_name: text("recruiter_name"),
        recruiter_email: text("recruiter_email"),
        notes: text("notes"),
    };

    let last_updated = match cell("last_updated") {
        Some(raw) => Some(
            parse_timestamp(raw).ok_or_else(|| format!("last_updated: invalid timestamp '{raw}'"))?,
        ),
        None => None,
    };

    Ok((app, last_updated))
}

// --- Date and timestamp helpers ---

pub fn now_timestamp() -> String {
    format_timestamp(Local::now().naive_local())
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses an ISO date. A full timestamp is accepted and truncated to its date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date()))
}

/// Parses a local timestamp in `YYYY-MM-DD HH:MM[:SS[.f]]` form (space or
/// `T` separator) or RFC 3339, which is converted to local time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn timestamps_sort_as_text() {
        let earlier = parse_timestamp("2024-03-01 09:00:00").unwrap();
        let later = parse_timestamp("2024-03-01 09:00:00.5").unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
        assert_eq!(format_timestamp(later), "2024-03-01 09:00:00.500000");
    }

    #[test]
    fn parse_date_accepts_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(parse_date("2024-05-17"), Some(expected));
        assert_eq!(parse_date(" 2024-05-17 00:00:00 "), Some(expected));
        assert_eq!(parse_date("17/05/2024"), None);
    }

    #[test]
    fn import_row_ignores_unknown_and_normalizes_keys() {
        let (app, last_updated) = parse_import_row(&row(&[
            (" Company ", "Acme"),
            ("ROLE_TITLE", "Engineer"),
            ("id", "99"),
            ("salary", "lots"),
            ("notes", "   "),
        ]))
        .unwrap();
        assert_eq!(app.company, "Acme");
        assert_eq!(app.role_title, "Engineer");
        assert_eq!(app.notes, None);
        assert_eq!(last_updated, None);
    }

    #[test]
    fn import_row_requires_company_and_role() {
        let err = parse_import_row(&row(&[("company", "Acme"), ("role_title", " ")])).unwrap_err();
        assert!(err.contains("role_title"));
    }

    #[test]
    fn import_row_rejects_bad_dates() {
        let err = parse_import_row(&row(&[
            ("company", "Acme"),
            ("role_title", "Engineer"),
            ("deadline", "next week"),
        ]))
        .unwrap_err();
        assert!(err.contains("deadline"));
    }
}
