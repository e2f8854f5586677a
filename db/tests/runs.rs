use common::Verdict;
use db::models::run::Model as Run;
use db::test_utils::{setup_test_db, setup_test_store};
use db::{InMemoryRunStore, NewRun, RunStore, SqlRunStore, StoreError};

fn new_run(task: &str, author: &str, verdict: Verdict) -> NewRun {
    NewRun {
        event_id: "week-1".into(),
        task_id: task.into(),
        author: author.into(),
        solution_source: "def add(p, q):\n    return [a + b for a, b in zip(p, q)]\n".into(),
        solution_hash: "ab12".into(),
        verdict,
        comment: String::new(),
        invoker: Some(("sandbox-0".into(), 65044)),
    }
}

async fn exercise_store(store: &dyn RunStore) {
    let first = store.create(new_run("add", "alice", Verdict::Correct)).await.unwrap();
    let second = store
        .create(new_run("mul", "bob", Verdict::WrongAnswer))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.verdict().unwrap(), Verdict::Correct);
    assert_eq!(first.invoker(), Some(("sandbox-0".to_string(), 65044)));

    let mut rejudged = second.clone();
    rejudged.set_outcome(Verdict::CheckFailed, "task not found", None);
    let saved = store.save(&rejudged).await.unwrap();
    assert_eq!(saved.id, second.id);
    assert_eq!(saved.verdict, "CF");
    assert_eq!(saved.comment, "task not found");
    assert_eq!(saved.invoker(), None);
    assert_eq!(saved.solution_source, second.solution_source);

    let reloaded = store.get(second.id).await.unwrap().unwrap();
    assert_eq!(reloaded.verdict().unwrap(), Verdict::CheckFailed);

    let runs = store.for_event("week-1").await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(store.for_event("week-2").await.unwrap().is_empty());

    let mut ghost = reloaded.clone();
    ghost.id = 9_999;
    assert!(matches!(
        store.save(&ghost).await,
        Err(StoreError::NotFound(9_999))
    ));
}

#[tokio::test]
async fn test_sql_store_creates_and_updates_in_place() {
    exercise_store(&setup_test_store().await).await;
}

#[tokio::test]
async fn test_memory_store_matches_sql_store() {
    exercise_store(&InMemoryRunStore::new()).await;
}

#[tokio::test]
async fn test_same_solution_lookup_uses_task_and_hash() {
    let db = setup_test_db().await;
    Run::create(&db, new_run("add", "alice", Verdict::Correct)).await.unwrap();
    Run::create(&db, new_run("add", "bob", Verdict::Correct)).await.unwrap();
    Run::create(&db, new_run("mul", "carol", Verdict::Correct)).await.unwrap();

    let same = Run::find_same_solution(&db, "add", "ab12").await.unwrap();
    let authors: Vec<_> = same.iter().map(|r| r.author.as_str()).collect();
    assert_eq!(authors, vec!["alice", "bob"]);
}

#[tokio::test]
async fn test_store_connects_to_a_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let url = db::database_url(dir.path().join("nested/judge.db").to_str().unwrap());
    let store = SqlRunStore::connect(&url).await.unwrap();
    store.create(new_run("add", "alice", Verdict::Missing)).await.unwrap();
    assert_eq!(store.for_event("week-1").await.unwrap().len(), 1);
}
