use super::*;
use crate::ledger::init;
use crate::testing::FailingDb;
use sw_db::DuckDbBackend;

const TABLE: &str = "migrations";

fn setup() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    init(TABLE, &db).unwrap();
    db
}

fn three_tables() -> MigrationSet {
    ["a", "b", "c"]
        .iter()
        .map(|t| {
            Migration::new(
                format!("00{t}_create_{t}"),
                format!("CREATE TABLE {t} (id INT)"),
                format!("DROP TABLE {t}"),
            )
        })
        .collect()
}

fn states(statuses: &[MigrationStatus]) -> Vec<(&str, &MigrationState)> {
    statuses.iter().map(|s| (s.name.as_str(), &s.state)).collect()
}

#[test]
fn test_new_rejects_bad_table() {
    let db = setup();
    assert!(matches!(
        Runner::new(&db, "not a table"),
        Err(MigrateError::InvalidTableName(_))
    ));
}

#[test]
fn test_apply_all_then_skip() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();

    let report = runner.apply(&mut set);
    assert!(report.is_success());
    assert_eq!(report.applied, vec!["00a_create_a", "00b_create_b", "00c_create_c"]);
    assert!(report.skipped.is_empty());

    let report = runner.apply(&mut set);
    assert!(report.is_success());
    assert!(report.applied.is_empty());
    assert_eq!(report.skipped.len(), 3);
}

#[test]
fn test_apply_stops_at_first_failure() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    set.get_mut("00b_create_b").unwrap().up = "CREATE TABLEE b (id INT)".to_string();

    let report = runner.apply(&mut set);
    assert_eq!(report.applied, vec!["00a_create_a"]);
    let (name, err) = report.failure.as_ref().unwrap();
    assert_eq!(name, "00b_create_b");
    assert!(matches!(err, MigrateError::StatementFailed { .. }));
    assert!(!db.relation_exists("c").unwrap());

    // The recorded failure blocks further runs until resolved
    let report = runner.apply(&mut set);
    assert_eq!(report.skipped, vec!["00a_create_a"]);
    assert!(matches!(
        report.failure,
        Some((_, MigrateError::RecordedFailure { .. }))
    ));

    runner.resolve(&mut set, "00b_create_b").unwrap();
    set.get_mut("00b_create_b").unwrap().up = "CREATE TABLE b (id INT)".to_string();
    let report = runner.apply(&mut set);
    assert!(report.is_success());
    assert_eq!(report.applied, vec!["00b_create_b", "00c_create_c"]);
}

#[test]
fn test_apply_stops_on_drift() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    runner.apply(&mut set).into_result().unwrap();

    set.get_mut("00a_create_a").unwrap().down = "DROP TABLE IF EXISTS a".to_string();
    let report = runner.apply(&mut set);
    assert!(report.skipped.is_empty());
    assert!(matches!(
        report.failure,
        Some((_, MigrateError::Drift { direction: Direction::Down, .. }))
    ));
}

#[test]
fn test_rollback_steps_newest_first() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    runner.apply(&mut set).into_result().unwrap();

    let report = runner.rollback(&mut set, 2);
    assert!(report.is_success());
    assert_eq!(report.rolled_back, vec!["00c_create_c", "00b_create_b"]);
    assert!(db.relation_exists("a").unwrap());
    assert!(!db.relation_exists("b").unwrap());

    let report = runner.rollback(&mut set, 5);
    assert_eq!(report.rolled_back, vec!["00a_create_a"]);
    assert!(Ledger::new(&db, TABLE).unwrap().list().unwrap().is_empty());
}

#[test]
fn test_rollback_zero_steps_is_noop() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    runner.apply(&mut set).into_result().unwrap();

    let report = runner.rollback(&mut set, 0);
    assert!(report.rolled_back.is_empty());
    assert_eq!(Ledger::new(&db, TABLE).unwrap().list().unwrap().len(), 3);
}

#[test]
fn test_rollback_stops_on_failure() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    runner.apply(&mut set).into_result().unwrap();
    db.execute_batch("DROP TABLE c").unwrap();

    let report = runner.rollback(&mut set, 3);
    assert!(report.rolled_back.is_empty());
    assert!(matches!(
        report.into_result(),
        Err(MigrateError::StatementFailed { phase: Phase::Rollback, .. })
    ));
    assert!(db.relation_exists("b").unwrap());
}

#[test]
fn test_resolve_orphan_row() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    runner.apply(&mut set).into_result().unwrap();

    let mut local = MigrationSet::default();
    runner.resolve(&mut local, "00a_create_a").unwrap();
    assert!(!Ledger::new(&db, TABLE).unwrap().exists("00a_create_a").unwrap());

    let err = runner.resolve(&mut local, "never_existed").unwrap_err();
    assert!(matches!(err, MigrateError::DoesNotExist { .. }));
}

#[test]
fn test_status_reports_each_state() {
    let db = setup();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();
    set.push(Migration::new("00d_broken", "CREATE TABLEE d (id INT)", "DROP TABLE d"));
    set.push(Migration::new("00e_pending", "CREATE TABLE e (id INT)", "DROP TABLE e"));
    runner.apply(&mut set);

    let ledger = Ledger::new(&db, TABLE).unwrap();
    ledger.insert("00z_orphan", "SELECT 1", "SELECT 1").unwrap();
    ledger.mark_rolling_back("00c_create_c").unwrap();
    set.get_mut("00b_create_b").unwrap().up = "CREATE TABLE b (id BIGINT)".to_string();

    let statuses = runner.status(&set).unwrap();
    let states = states(&statuses);
    assert_eq!(states.len(), 6);

    assert!(matches!(
        states[0],
        ("00a_create_a", MigrationState::Applied { applied_at: Some(_) })
    ));
    assert_eq!(
        states[1],
        (
            "00b_create_b",
            &MigrationState::Drifted {
                direction: Direction::Up
            }
        )
    );
    assert_eq!(
        states[2],
        (
            "00c_create_c",
            &MigrationState::Incomplete {
                status: Status::RollingBack
            }
        )
    );
    assert!(matches!(states[3], ("00d_broken", MigrationState::Failed { .. })));
    assert_eq!(states[4], ("00e_pending", &MigrationState::Pending));
    assert_eq!(states[5], ("00z_orphan", &MigrationState::Orphaned));
}

#[test]
fn test_status_serializes_tagged() {
    let status = MigrationStatus {
        name: "m1".to_string(),
        state: MigrationState::Drifted {
            direction: Direction::Down,
        },
    };
    let yaml = serde_yaml::to_string(&status).unwrap();
    assert!(yaml.contains("name: m1"));
    assert!(yaml.contains("state: drifted"));
    assert!(yaml.contains("direction: down"));
}

#[test]
fn test_apply_stops_on_row_left_applying() {
    let mut db = FailingDb::wrap(setup()).fail_on("SET applied_at");
    let mut set = three_tables();

    let report = Runner::new(&db, TABLE).unwrap().apply(&mut set);
    assert!(report.applied.is_empty());
    assert!(matches!(
        report.failure,
        Some((_, MigrateError::PartialCompletion { phase: Phase::Apply, .. }))
    ));

    db.heal();
    let report = Runner::new(&db, TABLE).unwrap().apply(&mut set);
    assert!(report.skipped.is_empty());
    assert!(report.applied.is_empty());
    let (name, err) = report.failure.as_ref().unwrap();
    assert_eq!(name, "00a_create_a");
    assert!(
        matches!(
            err,
            MigrateError::Incomplete {
                phase: Phase::Apply,
                status: Status::Applying,
                ..
            }
        ),
        "{err}"
    );
    assert!(err.to_string().contains("'applying'"));
    assert!(!db.relation_exists("b").unwrap());
}

#[test]
fn test_rollback_stops_on_row_left_rolling_back() {
    let mut db = FailingDb::wrap(setup());
    let mut set = three_tables();
    Runner::new(&db, TABLE)
        .unwrap()
        .apply(&mut set)
        .into_result()
        .unwrap();

    db = db.fail_on("DELETE FROM");
    let report = Runner::new(&db, TABLE).unwrap().rollback(&mut set, 1);
    assert!(matches!(
        report.failure,
        Some((_, MigrateError::PartialCompletion { phase: Phase::Rollback, .. }))
    ));
    assert!(!db.relation_exists("c").unwrap());

    db.heal();
    let report = Runner::new(&db, TABLE).unwrap().rollback(&mut set, 3);
    assert!(report.rolled_back.is_empty());
    let (name, err) = report.failure.as_ref().unwrap();
    assert_eq!(name, "00c_create_c");
    assert!(
        matches!(
            err,
            MigrateError::Incomplete {
                phase: Phase::Rollback,
                status: Status::RollingBack,
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(db.ran("DROP TABLE c"), 1);
    assert!(db.relation_exists("b").unwrap());
}

#[test]
fn test_storage_errors_carry_their_phase() {
    let db = DuckDbBackend::in_memory().unwrap();
    let runner = Runner::new(&db, TABLE).unwrap();
    let mut set = three_tables();

    let err = runner.resolve(&mut MigrationSet::default(), "orphan").unwrap_err();
    assert!(
        matches!(err, MigrateError::Storage { phase: Phase::Resolve, .. }),
        "{err}"
    );
    assert!(err.to_string().contains("[resolve:orphan]"));

    let err = runner.status(&set).unwrap_err();
    assert!(
        matches!(err, MigrateError::Storage { phase: Phase::Status, .. }),
        "{err}"
    );

    let report = runner.apply(&mut set);
    assert!(matches!(
        report.failure,
        Some((_, MigrateError::Storage { phase: Phase::Apply, .. }))
    ));
}
