use usercrud_core::db::open_factory_in_memory;
use usercrud_core::{
    ConstraintViolation, PersistenceError, SqliteUserRepository, User, UserRepository,
};

fn repo() -> SqliteUserRepository {
    SqliteUserRepository::new(open_factory_in_memory().unwrap())
}

#[test]
fn create_assigns_id_and_created_at() {
    let repo = repo();

    let created = repo
        .create(&User::new("Alice", "alice@test.com", Some(30)))
        .unwrap();

    assert_eq!(created.id, Some(1));
    assert_eq!(created.name, "Alice");
    assert_eq!(created.email, "alice@test.com");
    assert_eq!(created.age, Some(30));
    assert!(created.created_at.unwrap() > 0);
}

#[test]
fn create_keeps_caller_supplied_created_at() {
    let repo = repo();
    let mut user = User::new("Bob", "bob@test.com", None);
    user.created_at = Some(1_234_567_890_000);

    let created = repo.create(&user).unwrap();

    assert_eq!(created.created_at, Some(1_234_567_890_000));
}

#[test]
fn create_rejects_already_persisted_user() {
    let repo = repo();
    let created = repo.create(&User::new("Alice", "a@test.com", None)).unwrap();

    let err = repo.create(&created).unwrap_err();

    assert!(matches!(err, PersistenceError::AlreadyPersisted(1)));
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn create_and_find_by_id_roundtrip() {
    let repo = repo();
    let created = repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();

    let loaded = repo.find_by_id(created.id.unwrap()).unwrap().unwrap();

    assert_eq!(loaded, created);
    assert!(repo.find_by_id(999).unwrap().is_none());
}

#[test]
fn find_by_email_ignores_case_and_surrounding_whitespace() {
    let repo = repo();
    let created = repo.create(&User::new("Alice", "Alice@Test.com", None)).unwrap();

    for lookup in [
        "alice@test.com",
        "  ALICE@TEST.COM\t",
        "aLiCe@tEsT.cOm  ",
        "alice@test.com\t",
        "\nALICE@test.com",
        " alice@test.com\r\n",
    ] {
        let found = repo.find_by_email(lookup).unwrap();
        assert_eq!(found.as_ref(), Some(&created), "lookup {lookup:?}");
    }
    assert!(repo.find_by_email("nobody@test.com").unwrap().is_none());
}

#[test]
fn find_all_on_empty_table_returns_empty_list() {
    assert!(repo().find_all().unwrap().is_empty());
}

#[test]
fn find_all_returns_rows_in_insertion_order() {
    let repo = repo();
    repo.create(&User::new("Carol", "c@test.com", None)).unwrap();
    repo.create(&User::new("Alice", "a@test.com", None)).unwrap();
    repo.create(&User::new("Bob", "b@test.com", None)).unwrap();

    let names: Vec<_> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|user| user.name)
        .collect();

    assert_eq!(names, vec!["Carol", "Alice", "Bob"]);
}

#[test]
fn duplicate_normalized_email_is_a_unique_violation() {
    let repo = repo();
    repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();

    let err = repo
        .create(&User::new("Impostor", "  ALICE@test.com ", None))
        .unwrap_err();

    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Unique));
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn tab_and_newline_padded_duplicate_is_a_unique_violation() {
    let repo = repo();
    repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();

    let err = repo
        .create(&User::new("Impostor", "\tAlice@Test.com\r\n", None))
        .unwrap_err();

    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Unique));
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn non_ascii_email_matches_and_collides_across_case() {
    let repo = repo();
    let created = repo.create(&User::new("Jörg", "JÖRG@test.de", None)).unwrap();

    assert_eq!(repo.find_by_email("jörg@test.de").unwrap(), Some(created.clone()));
    assert_eq!(repo.find_by_email(" JöRG@TEST.DE\t").unwrap(), Some(created));

    let err = repo
        .create(&User::new("Joerg", "jörg@test.de", None))
        .unwrap_err();
    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Unique));
    assert_eq!(repo.find_all().unwrap().len(), 1);
}

#[test]
fn update_keeps_normalized_email_in_step() {
    let repo = repo();
    let mut user = repo.create(&User::new("Élodie", "elodie@test.fr", None)).unwrap();

    user.email = "ÉLODIE@Test.fr".to_string();
    let updated = repo.update(&user).unwrap();

    assert_eq!(updated.email, "ÉLODIE@Test.fr");
    assert!(repo.find_by_email("elodie@test.fr").unwrap().is_none());
    assert_eq!(repo.find_by_email("élodie@test.fr").unwrap(), Some(updated));
    let err = repo
        .create(&User::new("Twin", "élodie@TEST.FR", None))
        .unwrap_err();
    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Unique));
}

#[test]
fn out_of_range_age_is_a_check_violation() {
    let repo = repo();

    let err = repo
        .create(&User::new("Old", "old@test.com", Some(151)))
        .unwrap_err();

    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Check));
    assert!(repo.find_all().unwrap().is_empty());
}

#[test]
fn null_required_column_is_a_not_null_violation() {
    let factory = open_factory_in_memory().unwrap();
    let raw = {
        let conn = factory.acquire().unwrap();
        conn.execute(
            "INSERT INTO users (name, email, email_normalized, created_at)
             VALUES (NULL, 'x@y.z', 'x@y.z', 1);",
            [],
        )
        .unwrap_err()
    };

    let err = PersistenceError::from(raw);

    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::NotNull));
}

#[test]
fn non_constraint_errors_are_not_classified() {
    assert_eq!(PersistenceError::MissingId.constraint_violation(), None);
    assert_eq!(PersistenceError::MissingRow(7).constraint_violation(), None);
}

#[test]
fn update_overwrites_all_fields_but_keeps_created_at() {
    let repo = repo();
    let mut user = repo.create(&User::new("Alice", "alice@test.com", Some(30))).unwrap();
    let created_at = user.created_at;

    user.name = "Alicia".to_string();
    user.email = "alicia@test.com".to_string();
    user.age = None;
    user.created_at = Some(1);
    let updated = repo.update(&user).unwrap();

    assert_eq!(updated.name, "Alicia");
    assert_eq!(updated.email, "alicia@test.com");
    assert_eq!(updated.age, None);
    assert_eq!(updated.created_at, created_at);
    assert_eq!(repo.find_by_id(updated.id.unwrap()).unwrap(), Some(updated));
}

#[test]
fn update_without_id_is_rejected() {
    let err = repo()
        .update(&User::new("Ghost", "ghost@test.com", None))
        .unwrap_err();
    assert!(matches!(err, PersistenceError::MissingId));
}

#[test]
fn update_of_deleted_row_fails_with_missing_row() {
    let repo = repo();
    let user = repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();
    repo.delete(user.id.unwrap()).unwrap();

    let err = repo.update(&user).unwrap_err();

    assert!(matches!(err, PersistenceError::MissingRow(1)));
}

#[test]
fn failed_update_rolls_back_and_leaves_row_untouched() {
    let repo = repo();
    repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();
    let mut bob = repo.create(&User::new("Bob", "bob@test.com", Some(40))).unwrap();

    bob.name = "Robert".to_string();
    bob.email = "ALICE@test.com".to_string();
    let err = repo.update(&bob).unwrap_err();

    assert_eq!(err.constraint_violation(), Some(ConstraintViolation::Unique));
    let stored = repo.find_by_id(bob.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.name, "Bob");
    assert_eq!(stored.email, "bob@test.com");
}

#[test]
fn delete_is_idempotent_and_ids_are_not_reused() {
    let repo = repo();
    let first = repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();
    let first_id = first.id.unwrap();

    repo.delete(first_id).unwrap();
    repo.delete(first_id).unwrap();
    repo.delete(12345).unwrap();

    assert!(repo.find_by_id(first_id).unwrap().is_none());
    let second = repo.create(&User::new("Alice", "alice@test.com", None)).unwrap();
    assert_ne!(second.id, Some(first_id));
}
