mod tui;

use anyhow::{Context, Result};
use apptrack::db::{format_timestamp, parse_date};
use apptrack::models::{
    canonical_option, CLEARABLE_FIELDS, PRIORITY_OPTIONS, SOURCE_OPTIONS, STATUS_OPTIONS,
};
use apptrack::views::{self, Summary};
use apptrack::{
    transfer, Application, ApplicationFilter, ApplicationPatch, Database, NewApplication,
    StoreError,
};
use chrono::{Local, NaiveDate};
use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "apptrack")]
#[command(about = "Job application tracker - record, filter, and follow up on applications")]
struct Cli {
    /// Path to the SQLite database (defaults to the platform data directory)
    #[arg(long, global = true, env = "APPTRACK_DB")]
    db: Option<PathBuf>,

    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add an application
    Add {
        /// Company name
        company: String,

        /// Role title
        role_title: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// List applications, most recently updated first
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show application details
    Show {
        /// Application ID
        id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Edit an application (only the given fields change)
    Edit {
        /// Application ID
        id: i64,

        /// New company name
        #[arg(long)]
        company: Option<String>,

        /// New role title
        #[arg(long = "role")]
        role_title: Option<String>,

        #[command(flatten)]
        fields: FieldArgs,

        /// Clear a field (repeatable)
        #[arg(long, value_name = "FIELD", value_parser = PossibleValuesParser::new(CLEARABLE_FIELDS))]
        clear: Vec<String>,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: i64,
    },

    /// Show counts, upcoming deadlines, and follow-ups due today
    Stats,

    /// Print a follow-up email for an application
    Followup {
        /// Application ID
        id: i64,

        /// Recipient name (defaults to the recruiter, then "Hiring Team")
        #[arg(long)]
        to: Option<String>,
    },

    /// Export all applications as CSV
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import applications from a CSV file
    Import {
        /// CSV file with at least company and role_title columns
        file: PathBuf,
    },

    /// Browse applications interactively
    Browse {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Filter by status
    #[arg(short, long, value_parser = parse_status)]
    status: Option<String>,

    /// Filter by source
    #[arg(long, value_parser = parse_source)]
    source: Option<String>,

    /// Search company and role title
    #[arg(short = 'q', long)]
    search: Option<String>,
}

impl From<FilterArgs> for ApplicationFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            status: args.status,
            source: args.source,
            search: args.search,
        }
    }
}

#[derive(Args)]
struct FieldArgs {
    /// Location
    #[arg(long)]
    location: Option<String>,

    /// Link to the job posting
    #[arg(long)]
    link: Option<String>,

    /// Where the posting was found
    #[arg(long, value_parser = parse_source)]
    source: Option<String>,

    /// Application status (default for add: Applied)
    #[arg(long, value_parser = parse_status)]
    status: Option<String>,

    /// Application deadline (YYYY-MM-DD or "today")
    #[arg(long, value_parser = parse_date_arg)]
    deadline: Option<NaiveDate>,

    /// Date applied (default for add: today)
    #[arg(long, value_parser = parse_date_arg)]
    applied: Option<NaiveDate>,

    /// Follow-up date
    #[arg(long, value_parser = parse_date_arg)]
    follow_up: Option<NaiveDate>,

    /// Priority (default for add: Medium)
    #[arg(long, value_parser = parse_priority)]
    priority: Option<String>,

    /// Recruiter name
    #[arg(long)]
    recruiter: Option<String>,

    /// Recruiter email
    #[arg(long)]
    recruiter_email: Option<String>,

    /// Free-form notes
    #[arg(short, long)]
    notes: Option<String>,
}

impl FieldArgs {
    fn into_new(self, company: String, role_title: String) -> NewApplication {
        NewApplication {
            company,
            role_title,
            location: self.location,
            job_link: self.link,
            source: self.source,
            status: self.status.or_else(|| Some("Applied".to_string())),
            deadline: self.deadline,
            date_applied: self.applied.or_else(|| Some(today())),
            follow_up_date: self.follow_up,
            priority: self.priority.or_else(|| Some("Medium".to_string())),
            recruiter_name: self.recruiter,
            recruiter_email: self.recruiter_email,
            notes: self.notes,
        }
    }

    fn into_patch(self) -> ApplicationPatch {
        ApplicationPatch {
            location: self.location.map(Some),
            job_link: self.link.map(Some),
            source: self.source.map(Some),
            status: self.status.map(Some),
            deadline: self.deadline.map(Some),
            date_applied: self.applied.map(Some),
            follow_up_date: self.follow_up.map(Some),
            priority: self.priority.map(Some),
            recruiter_name: self.recruiter.map(Some),
            recruiter_email: self.recruiter_email.map(Some),
            notes: self.notes.map(Some),
            ..Default::default()
        }
    }
}

fn parse_option(options: &[&'static str], value: &str) -> Result<String, String> {
    canonical_option(options, value)
        .map(str::to_string)
        .ok_or_else(|| format!("expected one of: {}", options.join(", ")))
}

fn parse_status(value: &str) -> Result<String, String> {
    parse_option(&STATUS_OPTIONS, value)
}

fn parse_source(value: &str) -> Result<String, String> {
    parse_option(&SOURCE_OPTIONS, value)
}

fn parse_priority(value: &str) -> Result<String, String> {
    parse_option(&PRIORITY_OPTIONS, value)
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    if value.trim().eq_ignore_ascii_case("today") {
        return Ok(today());
    }
    parse_date(value).ok_or_else(|| format!("expected YYYY-MM-DD or \"today\", got '{}'", value))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let db = Database::new(cli.db.unwrap_or_else(Database::default_path));
    db.initialize()
        .with_context(|| format!("Failed to open database at {}", db.path().display()))?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Add {
            company,
            role_title,
            fields,
        } => {
            let id = db.create(&fields.into_new(company, role_title))?;
            println!("Added application #{}", id);
        }

        Commands::List { filter, json } => {
            let apps = db.read(&filter.into())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&apps)?);
            } else if apps.is_empty() {
                println!("No applications found.");
            } else {
                print_table(&apps);
                println!("\n{} application(s)", apps.len());
            }
        }

        Commands::Show { id, json } => {
            let app = db.get(id)?.ok_or(StoreError::NotFound(id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&app)?);
            } else {
                print_details(&app);
            }
        }

        Commands::Edit {
            id,
            company,
            role_title,
            fields,
            clear,
        } => {
            let mut patch = fields.into_patch();
            patch.company = company;
            patch.role_title = role_title;
            for field in &clear {
                patch.clear(field);
            }

            if patch.is_empty() {
                println!("Nothing to change. Pass at least one field or --clear.");
            } else {
                db.update(id, &patch)?;
                println!("Updated application #{}", id);
            }
        }

        Commands::Delete { id } => {
            db.delete(id)?;
            println!("Deleted application #{}", id);
        }

        Commands::Stats => {
            let apps = db.read(&ApplicationFilter::default())?;
            if apps.is_empty() {
                println!("No applications yet. Add one with 'apptrack add'.");
            } else {
                print_stats(&apps, today());
            }
        }

        Commands::Followup { id, to } => {
            let app = db.get(id)?.ok_or(StoreError::NotFound(id))?;
            print!("{}", views::follow_up_message(&app, to.as_deref()));
        }

        Commands::Export { output } => match output {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                let count = transfer::export_csv(&db, file)?;
                println!("Exported {} application(s) to {}", count, path.display());
            }
            None => {
                transfer::export_csv(&db, std::io::stdout().lock())?;
            }
        },

        Commands::Import { file } => {
            let reader = File::open(&file)
                .with_context(|| format!("Failed to read CSV file: {}", file.display()))?;
            let count = transfer::import_csv(&db, reader)
                .with_context(|| format!("Import of {} failed", file.display()))?;
            println!("Imported {} application(s)", count);
        }

        Commands::Browse { filter } => {
            tui::run_browse(&db, &filter.into())?;
        }
    }

    Ok(())
}

fn print_table(apps: &[Application]) {
    println!(
        "{:<6} {:<18} {:<22} {:<26} {:<10} {:<16}",
        "ID", "STATUS", "COMPANY", "ROLE", "DEADLINE", "UPDATED"
    );
    println!("{}", "-".repeat(103));
    for app in apps {
        println!(
            "{:<6} {:<18} {:<22} {:<26} {:<10} {:<16}",
            app.id,
            app.status.as_deref().unwrap_or("-"),
            truncate(&app.company, 20),
            truncate(&app.role_title, 24),
            app.deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            app.last_updated
                .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
}

fn print_details(app: &Application) {
    println!("Application #{}", app.id);
    println!("Company: {}", app.company);
    println!("Role: {}", app.role_title);

    let optional = [
        ("Location", app.location.clone()),
        ("Link", app.job_link.clone()),
        ("Source", app.source.clone()),
        ("Status", app.status.clone()),
        ("Priority", app.priority.clone()),
        ("Deadline", app.deadline.map(|d| d.to_string())),
        ("Applied", app.date_applied.map(|d| d.to_string())),
        ("Follow up", app.follow_up_date.map(|d| d.to_string())),
        ("Recruiter", app.recruiter_name.clone()),
        ("Recruiter email", app.recruiter_email.clone()),
        ("Last updated", app.last_updated.map(format_timestamp)),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }

    if let Some(notes) = &app.notes {
        println!("\n--- Notes ---\n{}", notes);
    }
}

fn print_stats(apps: &[Application], today: NaiveDate) {
    let summary = Summary::from_records(apps);
    println!(
        "Total: {}   Applied: {}   Interviews: {}   Offers: {}",
        summary.total, summary.applied, summary.interviews, summary.offers
    );

    println!("\nBy status:");
    let counts = views::status_counts(apps);
    let widest = counts.iter().map(|c| c.count).max().unwrap_or(0);
    for c in &counts {
        // Bars scale to the largest bucket, at most 40 columns wide.
        let bar = "#".repeat(c.count * 40 / widest.max(1));
        println!("  {:<18} {:>4} {}", c.status, c.count, bar);
    }

    println!("\nUpcoming deadlines (next {} days):", views::UPCOMING_WINDOW_DAYS);
    let upcoming = views::upcoming_deadlines(apps, today);
    if upcoming.is_empty() {
        println!("  No deadlines in the next {} days.", views::UPCOMING_WINDOW_DAYS);
    }
    for app in upcoming {
        if let Some(deadline) = app.deadline {
            println!("  #{:<5} {}  {} - {}", app.id, deadline, app.company, app.role_title);
        }
    }

    println!("\nFollow-ups due today:");
    let due = views::due_follow_ups(apps, today);
    if due.is_empty() {
        println!("  No follow-ups due today.");
    }
    for app in due {
        println!("  #{:<5} {} - {}", app.id, app.company, app.role_title);
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
