mod common;

use common::{context, people, Person};
use repokit_core::{
    CoreConfig, DbError, FieldValue, ProcedureCatalog, Repository, SqliteRepository,
};

fn catalog() -> ProcedureCatalog {
    ProcedureCatalog::new()
        .with_default_schema("hr")
        .with_procedure(
            "hr.people_in_city",
            ["SELECT id, name, age, city FROM people WHERE city = :city AND deleted_at IS NULL ORDER BY id;"],
        )
        .with_procedure(
            "hr.city_report",
            [
                "SELECT id, name, age, city FROM people WHERE city = :city ORDER BY age DESC;",
                "SELECT COUNT(*) FROM people WHERE city = :city;",
                "SELECT MAX(age) FROM people WHERE city = :missing_city;",
            ],
        )
        .with_procedure(
            "hr.relocate",
            ["UPDATE people SET city = :to WHERE city = :from;"],
        )
        .with_procedure("hr.noop", Vec::<String>::new())
}

fn seeded_context() -> repokit_core::DataContext {
    let ctx = context().with_procedures(catalog());
    SqliteRepository::<Person>::try_new(&ctx)
        .unwrap()
        .insert_range(&people())
        .unwrap();
    ctx
}

#[test]
fn call_maps_rows_with_named_parameters() {
    let ctx = seeded_context();

    let parisians: Vec<Person> = ctx
        .stored_procedure("people_in_city", true)
        .unwrap()
        .with_parameter("city", "Paris")
        .call()
        .unwrap();
    assert_eq!(
        parisians.iter().map(|person| person.id).collect::<Vec<_>>(),
        vec![1, 3]
    );
}

#[test]
fn fully_qualified_name_resolves_without_default_schema() {
    let ctx = seeded_context();

    let command = ctx.stored_procedure("hr.people_in_city", false).unwrap();
    assert_eq!(command.name(), "hr.people_in_city");
}

#[test]
fn configured_default_schema_resolves_schema_qualified_procedures() {
    let config = CoreConfig::from_json_str(r#"{"default_schema":"hr"}"#).unwrap();
    let procedures = ProcedureCatalog::new().with_procedure(
        "hr.people_in_city",
        ["SELECT id, name, age, city FROM people WHERE city = :city ORDER BY id;"],
    );
    let ctx = context().with_procedures(procedures).with_config(&config);
    SqliteRepository::<Person>::try_new(&ctx)
        .unwrap()
        .insert_range(&people())
        .unwrap();

    let command = ctx.stored_procedure("people_in_city", true).unwrap();
    assert_eq!(command.name(), "hr.people_in_city");
    let londoners: Vec<Person> = command.with_parameter("city", "London").call().unwrap();
    assert_eq!(
        londoners.iter().map(|person| person.id).collect::<Vec<_>>(),
        vec![2, 5]
    );

    let unset = context()
        .with_procedures(catalog())
        .with_config(&CoreConfig::default());
    assert_eq!(unset.procedures().default_schema(), Some("hr"));
    assert_eq!(
        ProcedureCatalog::from_config(&config).qualified_name("relocate", true),
        "hr.relocate"
    );
}

#[test]
fn call_multi_reads_each_result_set_in_order() {
    let ctx = seeded_context();
    let mut londoners = Vec::new();
    let mut count = None;
    let mut oldest = Some(0);

    ctx.stored_procedure("city_report", true)
        .unwrap()
        .with_parameter(":city", "London")
        .with_null_parameter("missing_city")
        .call_multi(|results| {
            londoners = results.read_to_list::<Person>()?;
            assert!(results.next_result()?);
            count = results.read_to_value::<i64>()?;
            assert!(results.next_result()?);
            oldest = results.read_to_value::<i64>()?;
            assert!(!results.next_result()?);
            Ok(())
        })
        .unwrap();

    assert_eq!(
        londoners.iter().map(|person| person.id).collect::<Vec<_>>(),
        vec![5, 2]
    );
    assert_eq!(count, Some(2));
    assert_eq!(oldest, None);
}

#[test]
fn rereading_a_consumed_set_is_empty() {
    let ctx = seeded_context();

    ctx.stored_procedure("people_in_city", true)
        .unwrap()
        .with_parameter("city", "Berlin")
        .call_multi(|results| {
            assert_eq!(results.read_to_list::<Person>()?.len(), 1);
            assert!(results.read_to_list::<Person>()?.is_empty());
            Ok(())
        })
        .unwrap();
}

#[test]
fn execute_reports_changed_rows() {
    let ctx = seeded_context();

    let changed = ctx
        .stored_procedure("relocate", true)
        .unwrap()
        .with_parameter("from", "London")
        .with_parameter("to", "Dublin")
        .execute()
        .unwrap();
    assert_eq!(changed, 2);

    let rebound = ctx
        .stored_procedure("relocate", true)
        .unwrap()
        .with_parameter("from", "Paris")
        .with_parameter("to", "Lyon")
        .with_parameter("to", "Nice")
        .execute()
        .unwrap();
    assert_eq!(rebound, 2);

    let mut nice = None;
    ctx.sql_command("SELECT COUNT(*) FROM people WHERE city = :city;")
        .with_parameter("city", FieldValue::from("Nice"))
        .call_multi(|results| {
            nice = results.read_to_value::<i64>()?;
            Ok(())
        })
        .unwrap();
    assert_eq!(nice, Some(2));
}

#[test]
fn unknown_and_empty_commands_are_rejected() {
    let ctx = seeded_context();

    assert!(matches!(
        ctx.stored_procedure("missing", true),
        Err(DbError::UnknownProcedure(name)) if name == "hr.missing"
    ));
    assert!(matches!(
        ctx.stored_procedure("noop", true).unwrap().execute(),
        Err(DbError::InvalidCommand(_))
    ));
    assert!(matches!(
        ctx.sql_command("   ").call::<Person>(),
        Err(DbError::InvalidCommand(_))
    ));
}

#[test]
fn failing_statement_surfaces_driver_error() {
    let ctx = seeded_context();

    let err = ctx
        .sql_command("SELECT * FROM no_such_table;")
        .call::<Person>()
        .unwrap_err();
    assert!(matches!(err, DbError::Sqlite(_)));
}
