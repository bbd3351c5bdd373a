//! Command round-trips through a project snapshot file.

use clap::Parser;
use serde_json::json;
use std::path::Path;
use taskweave::cli::{Cli, CliError, EXIT_RUNTIME, exit_code_for};
use taskweave_core::{ProjectSnapshot, SelectStrategy};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run(project: &Path, args: &[&str]) -> Result<String, CliError> {
    let mut argv = vec!["taskweave", "--project", project.to_str().unwrap()];
    argv.extend_from_slice(args);
    taskweave::run(Cli::try_parse_from(argv).unwrap()).await
}

fn added_id(output: &str) -> String {
    output.trim_start_matches("Added task ").to_string()
}

#[tokio::test]
async fn test_edit_and_show() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("plan.json");

    let a = added_id(&run(&project, &["add-task"]).await.unwrap());
    let b = added_id(&run(&project, &["add-task"]).await.unwrap());
    run(&project, &["add-parent", b.as_str(), a.as_str()]).await.unwrap();
    run(&project, &["set-output-key", a.as_str(), "summary"]).await.unwrap();

    let snapshot = ProjectSnapshot::load(&project).unwrap();
    assert_eq!(snapshot.primitive_tasks.len(), 3);
    let task_b = snapshot.primitive_tasks.iter().find(|t| t.id == b).unwrap();
    assert_eq!(task_b.parent_ids, vec![a.clone()]);
    let task_a = snapshot.primitive_tasks.iter().find(|t| t.id == a).unwrap();
    assert_eq!(task_a.state_output_key.as_deref(), Some("summary"));

    let shown = run(&project, &["show"]).await.unwrap();
    assert!(shown.starts_with("Primitive tasks (3):"));
    assert!(shown.contains("[root]"));
    assert!(shown.contains(&format!("parents: {a}")));
    assert!(shown.contains("writes: summary"));

    let checked = run(&project, &["check"]).await.unwrap();
    assert!(checked.contains("primitive graph: ok"));
}

#[tokio::test]
async fn test_cycle_is_reported_with_runtime_exit_code() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("plan.json");

    let a = added_id(&run(&project, &["add-task"]).await.unwrap());
    let b = added_id(&run(&project, &["add-task"]).await.unwrap());
    run(&project, &["add-parent", b.as_str(), a.as_str()]).await.unwrap();

    let err = run(&project, &["add-parent", a.as_str(), b.as_str()]).await.unwrap_err();
    assert!(matches!(err, CliError::Graph { .. }));
    assert_eq!(exit_code_for(&err), EXIT_RUNTIME);
}

#[tokio::test]
async fn test_check_reports_broken_snapshot() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("plan.json");
    std::fs::write(
        &project,
        json!({
            "primitive_tasks": [
                { "id": "a", "label": "A", "parentIds": ["b"], "children": [] },
                { "id": "b", "label": "B", "parentIds": [], "children": [] }
            ]
        })
        .to_string(),
    )
    .unwrap();

    let err = run(&project, &["check"]).await.unwrap_err();
    assert!(err.to_string().contains("primitive graph: 1 problem(s)"));

    let err = run(&project, &["show"]).await.unwrap_err();
    assert!(matches!(err, CliError::Graph { .. }));
}

#[tokio::test]
async fn test_semantic_commands() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("plan.json");

    let output = run(&project, &["semantic", "add"]).await.unwrap();
    let id = output.trim_start_matches("Added semantic task ").to_string();
    run(&project, &["semantic", "add-parent", id.as_str(), "-1"]).await.unwrap();
    run(&project, &["semantic", "strategy", "greedy"]).await.unwrap();

    let snapshot = ProjectSnapshot::load(&project).unwrap();
    assert_eq!(snapshot.semantic_tasks.len(), 2);
    assert_eq!(snapshot.select_strategy, SelectStrategy::Greedy);
    let task = snapshot.semantic_tasks.iter().find(|t| t.id == id).unwrap();
    assert_eq!(task.parent_ids, vec!["-1"]);

    assert!(run(&project, &["semantic", "delete", "missing"]).await.is_err());
}

#[tokio::test]
async fn test_set_evaluators_from_file() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("plan.json");
    let a = added_id(&run(&project, &["add-task"]).await.unwrap());

    let file = dir.path().join("evaluators.json");
    std::fs::write(
        &file,
        json!([
            { "name": "Check", "task": a },
            { "name": "Check", "task": a }
        ])
        .to_string(),
    )
    .unwrap();
    run(&project, &["set-evaluators", file.to_str().unwrap()])
        .await
        .unwrap();

    let snapshot = ProjectSnapshot::load(&project).unwrap();
    let names: Vec<_> = snapshot.evaluators.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Check", "Check-1"]);
}

#[tokio::test]
async fn test_sync_stores_backend_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/primitive_task/update/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primitive_tasks": [
                { "id": "-1", "label": "Root", "parentIds": [], "children": [] },
                { "id": "srv", "label": "From server", "parentIds": [], "children": [] }
            ],
            "execution_state": { "srv": { "executable": true, "executed": true } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let project = dir.path().join("plan.json");
    run(&project, &["add-task"]).await.unwrap();
    let uri = server.uri();
    run(&project, &["sync", "--server", uri.as_str(), "--session", "cli-test"])
        .await
        .unwrap();

    let snapshot = ProjectSnapshot::load(&project).unwrap();
    assert_eq!(snapshot.primitive_tasks[1].id, "srv");
    assert!(snapshot.execution_state.unwrap()["srv"].executed);
}
