use newsdesk_core::{
    AgentId, Article, ConfigLoader, NO_REPORT, NextAgent, RunResult, RunStatus, SharedState,
    TraceSummary, capabilities_from_config,
};
use serde_json::{Value, json};

#[test]
fn loosely_typed_state_survives_normalization() {
    let raw = json!({
        "topic": "port strikes",
        "news_articles": [
            {"title": "Dockworkers walk out", "url": "https://example.org/a"},
            {"headline": "unexpected shape"}
        ],
        "analysis_results": {},
        "final_report": 42,
        "next_agent": "FINISH",
        "dashboard_only": true
    });

    let state = SharedState::normalize(raw);
    assert_eq!(state.topic, "port strikes");
    assert_eq!(state.news_articles.len(), 2);
    assert_eq!(state.news_articles[0].title, "Dockworkers walk out");
    assert_eq!(state.news_articles[1], Article::default());
    assert!(state.analysis_results.is_empty());
    assert!(state.final_report.is_empty());
    assert_eq!(state.next_agent, Some(NextAgent::Finish));
    assert!(state.messages.is_empty());

    let again = SharedState::normalize(serde_json::to_value(&state).unwrap());
    assert_eq!(again, state);
}

#[test]
fn run_result_serializes_for_callers() {
    let mut state = SharedState::new("port strikes");
    state.record(AgentId::Supervisor, "Supervisor decided next agent: Researcher");
    let result = RunResult::from_state(state, RunStatus::StepLimitReached, 1);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], Value::from("step_limit_reached"));
    assert_eq!(json["final_report"], Value::from(NO_REPORT));
    assert_eq!(json["messages"][0]["agent"], Value::from("Supervisor"));
    assert_eq!(
        json["trace"],
        json!(["Supervisor decided next agent: Researcher"])
    );

    let summary = TraceSummary::from_messages(&result.messages);
    assert_eq!(summary.steps.len(), 1);
    assert_eq!(summary.steps[0].agent, AgentId::Supervisor);
}

#[test]
fn config_file_drives_capabilities() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("newsdesk.toml");
    std::fs::write(
        &path,
        "[llm]\napi_key_env = \"NEWSDESK_TEST_UNSET_LLM_KEY\"\n\n\
         [search]\napi_key_env = \"NEWSDESK_TEST_UNSET_SEARCH_KEY\"\nfetch_full_text = true\n\n\
         [workflow]\ncall_timeout_secs = 3\n",
    )
    .unwrap();

    let config = ConfigLoader::load(Some(path)).unwrap();
    let caps = capabilities_from_config(&config);

    assert!(!caps.llm_available());
    assert!(!caps.search_available());
    assert!(caps.fetcher_available());
    assert_eq!(caps.call_timeout().as_secs(), 3);
}
