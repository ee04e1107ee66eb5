use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Category, Engine, EngineError, ExpenseCmd, ExplicitSplit, MemberKey, MoneyCents, NewMember,
    Percent, SettlementState, SplitPolicy, SplitRequest, UpdateExpenseCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for (username, display_name) in [("alice", "Alice"), ("bob", "Bob"), ("carol", "Carol")] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, display_name) VALUES (?, ?, ?)",
            vec![username.into(), "password".into(), display_name.into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

fn user(name: &str) -> MemberKey {
    MemberKey::User(name.to_string())
}

fn owed(expense: &engine::Expense) -> Vec<i64> {
    expense.splits.iter().map(|s| s.owed.cents()).collect()
}

#[tokio::test]
async fn creator_is_first_member_and_sees_the_group() {
    let (engine, _db) = engine_with_db().await;

    let group = engine.create_group("  Flat 4B ", "alice").await.unwrap();
    assert_eq!(group.name, "Flat 4B");
    assert_eq!(group.members.len(), 1);
    assert_eq!(group.members[0].display_name, "Alice");

    let groups = engine.list_groups("alice").await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, group.id);
    assert!(engine.list_groups("bob").await.unwrap().is_empty());

    let err = engine.group(group.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn unknown_user_cannot_create_group() {
    let (engine, _db) = engine_with_db().await;
    let err = engine.create_group("Trip", "mallory").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn members_are_added_and_deduplicated() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();

    let bob = engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    assert_eq!(bob.display_name, "Bob");
    assert_eq!(bob.key(), user("bob"));

    engine
        .add_guest_member(group.id, "Dave", "bob")
        .await
        .unwrap();

    let err = engine
        .add_member(group.id, NewMember::Guest("dave".to_string()), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let err = engine
        .add_registered_member(group.id, "mallory", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .add_guest_member(group.id, "Eve", "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let group = engine.group(group.id, "bob").await.unwrap();
    assert_eq!(group.member_count(), 3);
    assert_eq!(engine.list_groups("bob").await.unwrap().len(), 1);
}

#[tokio::test]
async fn equal_expense_reconciles_to_the_cent() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    engine
        .add_guest_member(group.id, "Dave", "alice")
        .await
        .unwrap();

    let expense = engine
        .create_expense(
            ExpenseCmd::new(group.id, "alice", "Dinner", MoneyCents::new(100_00))
                .category(Category::Food),
        )
        .await
        .unwrap();
    assert_eq!(owed(&expense), vec![33_34, 33_33, 33_33]);

    let stored = engine.expense(expense.id, "bob").await.unwrap();
    assert_eq!(stored.splits, expense.splits);
    assert_eq!(stored.payer_id, "alice");
    assert_eq!(stored.category, Category::Food);
}

#[tokio::test]
async fn summary_matches_worked_example() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    engine
        .create_expense(ExpenseCmd::new(group.id, "alice", "Hotel", MoneyCents::new(50_00)))
        .await
        .unwrap();

    let summary = engine.group_summary(group.id, "bob").await.unwrap();
    assert_eq!(summary.total_expenses, MoneyCents::new(50_00));
    assert_eq!(summary.expense_count, 1);
    assert_eq!(summary.member_count, 2);

    let alice = &summary.balances[0];
    assert_eq!(alice.record.key, user("alice"));
    assert_eq!(alice.record.total_paid, MoneyCents::new(50_00));
    assert_eq!(alice.record.total_owed, MoneyCents::new(25_00));
    assert_eq!(alice.settlement.state, SettlementState::Owed);
    assert_eq!(alice.settlement.amount, MoneyCents::new(25_00));

    let bob = &summary.balances[1];
    assert_eq!(bob.record.balance, MoneyCents::new(25_00));
    assert_eq!(bob.settlement.state, SettlementState::Owes);
}

#[tokio::test]
async fn non_member_cannot_add_expense() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    let err = engine
        .create_expense(ExpenseCmd::new(group.id, "bob", "Snacks", MoneyCents::new(5_00)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn invalid_percentages_persist_nothing() {
    let (engine, db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();

    let split = SplitRequest::percentage(vec![
        ExplicitSplit::percent(user("alice"), Percent::from_f64(60.0).unwrap()),
        ExplicitSplit::percent(user("bob"), Percent::from_f64(41.0).unwrap()),
    ]);
    let err = engine
        .create_expense(
            ExpenseCmd::new(group.id, "alice", "Rent", MoneyCents::new(1000_00)).split(split),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(count_rows(&db, "expenses").await, 0);
    assert_eq!(count_rows(&db, "expense_splits").await, 0);
}

#[tokio::test]
async fn only_payer_updates_and_splits_follow_amount() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    let expense = engine
        .create_expense(
            ExpenseCmd::new(group.id, "alice", "Rent", MoneyCents::new(1000_00)).split(
                SplitRequest::percentage(vec![
                    ExplicitSplit::percent(user("alice"), Percent::from_f64(70.0).unwrap()),
                    ExplicitSplit::percent(user("bob"), Percent::from_f64(30.0).unwrap()),
                ]),
            ),
        )
        .await
        .unwrap();
    assert_eq!(owed(&expense), vec![700_00, 300_00]);

    let err = engine
        .update_expense(UpdateExpenseCmd::new(expense.id, "bob").amount(MoneyCents::new(1_00)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let updated = engine
        .update_expense(
            UpdateExpenseCmd::new(expense.id, "alice")
                .amount(MoneyCents::new(10_01))
                .description("Rent (March)"),
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "Rent (March)");
    assert_eq!(updated.owed_total(), MoneyCents::new(10_01));
    assert_eq!(owed(&updated), vec![7_01, 3_00]);

    let switched = engine
        .update_expense(UpdateExpenseCmd::new(expense.id, "alice").policy(SplitPolicy::Equal))
        .await
        .unwrap();
    assert_eq!(owed(&switched), vec![5_00, 5_01]);
    assert_eq!(switched.policy, SplitPolicy::Equal);
    let stored = engine.expense(expense.id, "bob").await.unwrap();
    assert_eq!(stored.splits, switched.splits);
    assert_eq!(stored.amount, MoneyCents::new(10_01));
}

#[tokio::test]
async fn custom_split_within_a_cent_is_normalised() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();

    let expense = engine
        .create_expense(
            ExpenseCmd::new(group.id, "alice", "Tickets", MoneyCents::new(20_00)).split(
                SplitRequest::custom(vec![
                    ExplicitSplit::amount(user("alice"), MoneyCents::new(12_00)),
                    ExplicitSplit::amount(user("bob"), MoneyCents::new(7_99)),
                ]),
            ),
        )
        .await
        .unwrap();
    assert_eq!(expense.owed_total(), MoneyCents::new(20_00));

    let err = engine
        .create_expense(
            ExpenseCmd::new(group.id, "alice", "Tickets", MoneyCents::new(20_00)).split(
                SplitRequest::custom(vec![
                    ExplicitSplit::amount(user("alice"), MoneyCents::new(12_00)),
                    ExplicitSplit::amount(user("bob"), MoneyCents::new(7_98)),
                ]),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn expenses_are_listed_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    let now = Utc::now();
    for (description, days_ago) in [("old", 3), ("new", 0), ("mid", 1)] {
        engine
            .create_expense(
                ExpenseCmd::new(group.id, "alice", description, MoneyCents::new(1_00))
                    .occurred_at(now - Duration::days(days_ago)),
            )
            .await
            .unwrap();
    }

    let list = engine.list_expenses(group.id, "alice").await.unwrap();
    let descriptions: Vec<_> = list.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, vec!["new", "mid", "old"]);

    let err = engine.list_expenses(group.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn only_payer_deletes_expense_with_its_splits() {
    let (engine, db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    let expense = engine
        .create_expense(ExpenseCmd::new(group.id, "alice", "Taxi", MoneyCents::new(9_00)))
        .await
        .unwrap();

    let err = engine.delete_expense(expense.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_expense(expense.id, "alice").await.unwrap();
    assert_eq!(count_rows(&db, "expense_splits").await, 0);
    let err = engine.expense(expense.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn removed_member_keeps_their_balance() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    let bob = engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    let dave = engine
        .add_guest_member(group.id, "Dave", "alice")
        .await
        .unwrap();
    let expense = engine
        .create_expense(ExpenseCmd::new(group.id, "bob", "Fuel", MoneyCents::new(30_00)))
        .await
        .unwrap();

    let err = engine
        .remove_member(group.id, bob.id, "carol")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let creator_id = group.members[0].id;
    let err = engine
        .remove_member(group.id, creator_id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.remove_member(group.id, bob.id, "bob").await.unwrap();
    engine.remove_member(group.id, dave.id, "alice").await.unwrap();

    let summary = engine.group_summary(group.id, "alice").await.unwrap();
    assert_eq!(summary.member_count, 1);
    let total: MoneyCents = summary.balances.iter().map(|b| b.record.balance).sum();
    assert_eq!(total, MoneyCents::ZERO);

    let bob_row = summary
        .balances
        .iter()
        .find(|b| b.record.key == user("bob"))
        .unwrap();
    assert_eq!(bob_row.record.display_name, "Bob");
    assert_eq!(bob_row.record.balance, MoneyCents::new(-20_00));
    let dave_row = summary
        .balances
        .iter()
        .find(|b| b.record.key == dave.key())
        .unwrap();
    assert_eq!(dave_row.record.display_name, "Dave");
    assert_eq!(dave_row.record.balance, MoneyCents::new(10_00));

    // The payer keeps control of the expense after leaving.
    let updated = engine
        .update_expense(UpdateExpenseCmd::new(expense.id, "bob").amount(MoneyCents::new(33_00)))
        .await
        .unwrap();
    assert_eq!(owed(&updated), vec![11_00, 11_00, 11_00]);
}

#[tokio::test]
async fn update_can_target_historical_members() {
    let (engine, _db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    let dave = engine
        .add_guest_member(group.id, "Dave", "alice")
        .await
        .unwrap();
    let expense = engine
        .create_expense(ExpenseCmd::new(group.id, "alice", "Boat", MoneyCents::new(8_00)))
        .await
        .unwrap();
    engine.remove_member(group.id, dave.id, "alice").await.unwrap();

    let updated = engine
        .update_expense(
            UpdateExpenseCmd::new(expense.id, "alice").participants(vec![dave.key()]),
        )
        .await
        .unwrap();
    assert_eq!(owed(&updated), vec![8_00]);

    let summary = engine.group_summary(group.id, "alice").await.unwrap();
    let total: MoneyCents = summary.balances.iter().map(|b| b.record.balance).sum();
    assert_eq!(total, MoneyCents::ZERO);
    assert!(summary
        .balances
        .iter()
        .any(|b| b.record.key == dave.key() && b.record.balance == MoneyCents::new(8_00)));

    let stranger = MemberKey::User("carol".to_string());
    let err = engine
        .update_expense(UpdateExpenseCmd::new(expense.id, "alice").participants(vec![stranger]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn deleting_group_cascades() {
    let (engine, db) = engine_with_db().await;
    let group = engine.create_group("Trip", "alice").await.unwrap();
    engine
        .add_registered_member(group.id, "bob", "alice")
        .await
        .unwrap();
    let expense = engine
        .create_expense(ExpenseCmd::new(group.id, "bob", "Food", MoneyCents::new(12_00)))
        .await
        .unwrap();

    let err = engine.delete_group(group.id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    engine.delete_group(group.id, "alice").await.unwrap();
    for table in ["groups", "group_members", "expenses", "expense_splits"] {
        assert_eq!(count_rows(&db, table).await, 0, "{table} not empty");
    }
    let err = engine.expense(expense.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.group_summary(group.id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
