mod support;

use std::sync::Arc;

use common::Verdict;
use db::{InMemoryRunStore, NewRun, RunStore};
use judge::{NullSink, Orchestrator, Submission};
use support::{add_task, event_with, RecordingSink, ScriptedInvoker, ADD_SOURCE};
use testsys::check::single_number;
use testsys::{Catalog, Locator, NotebookContainer, Task};

fn catalog_with(task: Task) -> Catalog {
    let mut catalog = Catalog::new();
    catalog.register(event_with(vec![task]));
    catalog
}

async fn seed_runs(store: &InMemoryRunStore, count: usize, unknown_every: usize) {
    for i in 0..count {
        let task_id = if i % unknown_every == 0 { "retired" } else { "add" };
        store
            .create(NewRun {
                event_id: "week-1".into(),
                task_id: task_id.into(),
                author: format!("student-{i}"),
                solution_source: ADD_SOURCE.trim_end().into(),
                solution_hash: format!("{i:064x}"),
                verdict: Verdict::WrongAnswer,
                comment: "stale".into(),
                invoker: None,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_bulk_rejudge_reports_every_run_once() {
    let invoker = ScriptedInvoker::elementwise();
    let store = Arc::new(InMemoryRunStore::new());
    seed_runs(&store, 100, 10).await;
    let judge = Orchestrator::new(invoker.clone(), store.clone()).with_seed(3);

    let sink = RecordingSink::new();
    let results = judge
        .rejudge(store.runs(), &catalog_with(add_task()), &sink)
        .await;

    assert_eq!(results.len(), 100);
    let not_found: Vec<_> = results
        .values()
        .filter(|r| r.verdict == Verdict::CheckFailed)
        .collect();
    assert_eq!(not_found.len(), 10);
    assert!(not_found
        .iter()
        .all(|r| r.cause.as_deref() == Some("task not found")));
    assert_eq!(results.values().filter(|r| r.is_ok()).count(), 90);

    assert_eq!(sink.steps(), 100);
    let finals = sink.finals();
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0], results);

    // two tests per resolved run
    assert_eq!(invoker.dispatches(), 180);

    for run in store.runs() {
        let expected = if run.task_id == "retired" {
            Verdict::CheckFailed
        } else {
            Verdict::Correct
        };
        assert_eq!(run.verdict().unwrap(), expected);
    }
}

#[tokio::test]
async fn test_rejudging_unchanged_source_reproduces_the_verdict() {
    let invoker = ScriptedInvoker::elementwise();
    let store = Arc::new(InMemoryRunStore::new());
    let judge = Orchestrator::new(invoker.clone(), store.clone()).with_seed(11);

    let broken = "def add(p, q):\n    # broken\n    return [0 for _ in p]\n";
    for (author, source) in [("mia", ADD_SOURCE), ("noah", broken)] {
        let event = event_with(vec![add_task()]);
        let submission = Submission::new("week-1", author, NotebookContainer::single(source));
        judge.judge(&event, &submission, &NullSink).await;
    }
    let before = store.runs();
    let requests_before = invoker.requests();

    let rejudged = judge
        .rejudge(before.clone(), &catalog_with(add_task()), &NullSink)
        .await;

    for run in &before {
        assert_eq!(rejudged[&run.id].verdict, run.verdict().unwrap());
        assert_eq!(rejudged[&run.id].cause.clone().unwrap_or_default(), run.comment);
    }
    let requests_after = invoker.requests();
    assert_eq!(
        requests_before.iter().map(|r| &r.args).collect::<Vec<_>>(),
        requests_after[requests_before.len()..]
            .iter()
            .map(|r| &r.args)
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_rejudge_applies_the_current_task_definition() {
    let invoker = ScriptedInvoker::new(|_| Ok(invoker_pool::TestingResponse::ok(serde_json::json!(1))));
    let store = Arc::new(InMemoryRunStore::new());
    let judge = Orchestrator::new(invoker, store.clone());

    let lenient = || {
        Task::builder("one", Locator::function("one"))
            .checker(single_number())
            .test(testsys::ArgList::new())
            .solution(|_| Ok(serde_json::json!(1)))
            .build()
    };
    let event = event_with(vec![lenient()]);
    let submission = Submission::new(
        "week-1",
        "olga",
        NotebookContainer::single("def helper():\n    pass\n\ndef one():\n    return 1\n"),
    );
    let results = judge.judge(&event, &submission, &NullSink).await;
    assert!(results["one"].is_ok());
    let stored = store.runs();
    assert_eq!(stored[0].solution_source, "def one():\n    return 1");

    let strict = Task::builder("one", Locator::function("one"))
        .checker(single_number())
        .test(testsys::ArgList::new())
        .solution(|_| Ok(serde_json::json!(2)))
        .build();
    let rejudged = judge
        .rejudge(stored.clone(), &catalog_with(strict), &NullSink)
        .await;

    let run_id = stored[0].id;
    assert_eq!(rejudged[&run_id].verdict, Verdict::WrongAnswer);
    let updated = store.get(run_id).await.unwrap().unwrap();
    assert_eq!(updated.verdict().unwrap(), Verdict::WrongAnswer);
    assert_eq!(updated.comment, "[test 1] expected '2', got '1'");
    assert_eq!(updated.solution_hash, stored[0].solution_hash);
}

#[tokio::test]
#[serial_test::serial]
async fn test_configured_seed_drives_generation() {
    common::config::JudgeConfig::set_judge_seed(5);

    let generated = Task::builder("pick", Locator::function("pick"))
        .checker(single_number())
        .test(testsys::Gen::new(|rng| {
            use rand::Rng;
            testsys::Arguments::positional([rng.gen_range(0..1_000_000)])
        }))
        .solution(|call| Ok(call.arg(0).cloned().unwrap_or_default()))
        .build();
    let event = event_with(vec![generated]);
    let submission = Submission::new(
        "week-1",
        "rita",
        NotebookContainer::single("def pick(x):\n    return x\n"),
    );

    let mut seen = Vec::new();
    for invoker in [ScriptedInvoker::new(echo), ScriptedInvoker::new(echo)] {
        let configured = Orchestrator::new(invoker.clone(), Arc::new(InMemoryRunStore::new()));
        configured.judge(&event, &submission, &NullSink).await;
        seen.push(invoker.requests()[0].args.clone());
    }
    let explicit = ScriptedInvoker::new(echo);
    Orchestrator::new(explicit.clone(), Arc::new(InMemoryRunStore::new()))
        .with_seed(5)
        .judge(&event, &submission, &NullSink)
        .await;

    assert_eq!(seen[0], seen[1]);
    assert_eq!(seen[0], explicit.requests()[0].args);

    common::config::JudgeConfig::reset();
}

fn echo(
    request: &invoker_pool::TestingRequest,
) -> Result<invoker_pool::TestingResponse, invoker_pool::PoolError> {
    Ok(invoker_pool::TestingResponse::ok(
        request.args.first().cloned().unwrap_or_default(),
    ))
}
