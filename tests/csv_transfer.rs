use apptrack::transfer::{export_csv, import_csv};
use apptrack::{Application, ApplicationFilter, Database, FieldMap, StoreError};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct TestDb {
    _dir: TempDir,
    db: Database,
}

fn open_store() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::new(dir.path().join("apptrack.db"));
    db.initialize().unwrap();
    TestDb { _dir: dir, db }
}

#[fixture]
fn store() -> TestDb {
    open_store()
}

fn row(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn all(db: &Database) -> Vec<Application> {
    db.read(&ApplicationFilter::default()).unwrap()
}

/// Application fields minus the store-assigned id.
fn without_id(apps: Vec<Application>) -> Vec<Application> {
    apps.into_iter().map(|app| Application { id: 0, ..app }).collect()
}

#[rstest]
fn export_writes_header_and_rows_in_listing_order(store: TestDb) {
    store
        .db
        .bulk_import(&[
            row(&[("company", "Older"), ("role_title", "A"), ("last_updated", "2024-01-01 08:00:00")]),
            row(&[
                ("company", "Newer, Inc."),
                ("role_title", "B"),
                ("deadline", "2024-02-01"),
                ("last_updated", "2024-01-02 08:00:00"),
            ]),
        ])
        .unwrap();

    let mut buf = Vec::new();
    assert_eq!(export_csv(&store.db, &mut buf).unwrap(), 2);
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "id,company,role_title,location,job_link,source,status,deadline,date_applied,\
         follow_up_date,priority,recruiter_name,recruiter_email,notes,last_updated"
    );
    assert_eq!(lines[1], "2,\"Newer, Inc.\",B,,,,,2024-02-01,,,,,,,2024-01-02 08:00:00.000000");
    assert_eq!(lines[2], "1,Older,A,,,,,,,,,,,,2024-01-01 08:00:00.000000");
}

#[rstest]
fn export_of_empty_store_is_header_only(store: TestDb) {
    let mut buf = Vec::new();
    assert_eq!(export_csv(&store.db, &mut buf).unwrap(), 0);
    assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
}

#[rstest]
fn round_trip_preserves_field_values(store: TestDb) {
    store
        .db
        .bulk_import(&[
            row(&[
                ("company", "Acme"),
                ("role_title", "Engineer"),
                ("location", "Toronto, ON"),
                ("job_link", "https://acme.example/jobs?id=1&ref=x"),
                ("source", "LinkedIn"),
                ("status", "Applied"),
                ("deadline", "2024-07-01"),
                ("date_applied", "2024-06-01"),
                ("follow_up_date", "2024-06-15"),
                ("priority", "High"),
                ("recruiter_name", "Jane \"JD\" Doe"),
                ("recruiter_email", "jane@acme.example"),
                ("notes", "line one\nline two"),
                ("last_updated", "2024-06-01 12:30:00.250000"),
            ]),
            row(&[("company", "Globex"), ("role_title", "Analyst")]),
        ])
        .unwrap();

    let mut buf = Vec::new();
    export_csv(&store.db, &mut buf).unwrap();

    let other = open_store();
    assert_eq!(import_csv(&other.db, buf.as_slice()).unwrap(), 2);

    assert_eq!(without_id(all(&other.db)), without_id(all(&store.db)));
}

#[rstest]
fn import_normalizes_headers_and_ignores_unknown_columns(store: TestDb) {
    let csv = " Company ,ROLE_TITLE,Salary,Status\nAcme,Engineer,100k,Applied\nGlobex,Analyst,,\n";
    assert_eq!(import_csv(&store.db, csv.as_bytes()).unwrap(), 2);

    let apps = all(&store.db);
    let acme = apps.iter().find(|a| a.company == "Acme").unwrap();
    assert_eq!(acme.role_title, "Engineer");
    assert_eq!(acme.status.as_deref(), Some("Applied"));
    let globex = apps.iter().find(|a| a.company == "Globex").unwrap();
    assert_eq!(globex.status, None);
}

#[rstest]
#[case("company,location\nAcme,Remote\n")]
#[case("role_title\nEngineer\n")]
#[case("")]
fn import_requires_company_and_role_columns(store: TestDb, #[case] csv: &str) {
    let err = import_csv(&store.db, csv.as_bytes()).unwrap_err();
    assert!(matches!(err, StoreError::Import(_)), "{err:?}");
    assert!(all(&store.db).is_empty());
}

#[rstest]
fn import_rejects_whole_file_on_bad_row(store: TestDb) {
    let csv = "company,role_title,deadline\nAcme,Engineer,2024-07-01\nGlobex,Analyst,soon\n";
    let err = import_csv(&store.db, csv.as_bytes()).unwrap_err();
    match err {
        StoreError::Import(reason) => {
            assert!(reason.contains("row 2"), "{reason}");
            assert!(reason.contains("deadline"), "{reason}");
        }
        other => panic!("expected import error, got {other:?}"),
    }
    assert!(all(&store.db).is_empty());
}

#[rstest]
fn import_ignores_exported_ids(store: TestDb) {
    store
        .db
        .bulk_import(&[row(&[("company", "Acme"), ("role_title", "Engineer")])])
        .unwrap();
    let csv = "id,company,role_title\n1,Acme,Engineer\n";
    assert_eq!(import_csv(&store.db, csv.as_bytes()).unwrap(), 1);

    let ids: Vec<i64> = all(&store.db).iter().map(|a| a.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&1) && ids.contains(&2));
}
