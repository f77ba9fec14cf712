//! The dispatch loop end to end with stubbed reasoning and search.

mod common;

use common::{orchestrator, use_tool, write_pdf, FixedSearch, ScriptedChooser};
use multitool::agent::{Action, Role, Session, DEFAULT_MAX_ITERATIONS};
use std::sync::Arc;

#[tokio::test]
async fn stops_after_the_iteration_cap() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(dir.path());
    let chooser = Arc::new(ScriptedChooser::new(vec![], use_tool("calculator", "1+1")));
    let agent = orchestrator.build_agent_with(chooser.clone(), Arc::new(FixedSearch("nothing")));
    let mut session = Session::new("looper");

    let response = agent.run(&mut session, "keep going").await.unwrap();

    assert_eq!(DEFAULT_MAX_ITERATIONS, 5);
    assert_eq!(chooser.calls(), DEFAULT_MAX_ITERATIONS);
    assert_eq!(response.tool_calls.len(), DEFAULT_MAX_ITERATIONS);
    assert!(response.stopped_early);
    assert_eq!(response.content, "Here is what I found so far.");
}

#[tokio::test]
async fn every_tool_reachable_in_one_turn() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "guide.pdf", &["The mountain hut sleeps twelve."]);
    let orchestrator = orchestrator(dir.path());

    let chooser = Arc::new(ScriptedChooser::new(
        vec![
            use_tool("Todo List", "add:pack boots"),
            use_tool("calculator", "12 * (3 + 4)"),
            use_tool("web_search", "weather"),
            use_tool("doc_reader", &format!("load:{}", pdf.display())),
            use_tool("doc_reader", "How many people fit in the mountain hut?"),
        ],
        Action::Finish("done".to_string()),
    ));
    let agent = orchestrator
        .build_agent_with(chooser, Arc::new(FixedSearch("Sunny, 21C")))
        .with_max_iterations(10);
    let mut session = Session::new("hiker");

    let response = agent.run(&mut session, "plan my trip").await.unwrap();
    assert_eq!(response.content, "done");
    assert!(!response.stopped_early);

    let results: Vec<&str> = response.tool_calls.iter().map(|c| c.result.as_str()).collect();
    assert_eq!(results[0], "Task added: \"pack boots\"");
    assert_eq!(results[1], "84");
    assert_eq!(results[2], "Sunny, 21C");
    assert!(results[3].contains("guide.pdf"));
    assert!(results[4].contains("sleeps twelve"));

    assert_eq!(session.todo.render(), "1. pack boots");
    assert_eq!(session.transcript.last().map(|t| t.role), Some(Role::Assistant));
}

#[tokio::test]
async fn tool_errors_are_observations() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(dir.path());
    let chooser = Arc::new(ScriptedChooser::new(
        vec![
            use_tool("calculator", "__import__('os')"),
            use_tool("todo", "remove:3"),
        ],
        Action::Finish("sorry".to_string()),
    ));
    let agent = orchestrator.build_agent_with(chooser, Arc::new(FixedSearch("")));
    let mut session = Session::new("tester");

    let response = agent.run(&mut session, "break things").await.unwrap();
    assert_eq!(response.content, "sorry");
    assert!(response.tool_calls[0]
        .result
        .starts_with("Invalid mathematical expression"));
    assert!(response.tool_calls[1].result.starts_with("Invalid task number"));
}
