use crate::support::{echo_session, test_runtime};
use tutor_core::{ChatMessage, LlmProviderKind, MessageRole, DEFAULT_PROJECT};

#[test]
fn app_state_records_messages() {
    let runtime = test_runtime();
    let session = echo_session();

    let outcome = runtime.block_on(session.state.send_user_message("hello world"));
    assert!(outcome.success);
    assert_eq!(outcome.response, "openai #1");

    let messages = session.state.active_messages();
    assert_eq!(
        messages,
        vec![
            ChatMessage::user("hello world"),
            ChatMessage::assistant("openai #1")
        ]
    );
}

#[test]
fn projects_keep_separate_transcripts() {
    let runtime = test_runtime();
    let session = echo_session();
    let state = &session.state;

    runtime.block_on(state.send_user_message("general question"));
    assert!(state.create_project("DataView"));
    assert!(state.switch_project("DataView"));
    runtime.block_on(state.send_user_message("dataview question"));

    assert_eq!(
        state.active_messages().first().map(|m| m.content.clone()),
        Some("dataview question".to_string())
    );
    let requests = session.openai.requests.lock();
    assert_eq!(requests[1].history, vec![ChatMessage::user("dataview question")]);

    assert!(state.switch_project(DEFAULT_PROJECT));
    let general = state.active_messages();
    assert_eq!(general.len(), 2);
    assert_eq!(general[0].content, "general question");
}

#[test]
fn a_b_create_delete_scenario() {
    let session = echo_session();
    let state = &session.state;
    assert!(state.delete_project(DEFAULT_PROJECT));

    assert!(state.create_project("A"));
    assert!(state.create_project("B"));
    assert_eq!(state.active_project_name().as_deref(), Some("A"));
    assert!(state.delete_project("A"));
    assert_eq!(state.active_project_name().as_deref(), Some("B"));
    assert!(state.delete_project("B"));
    assert_eq!(state.active_project_name(), None);
    assert!(!state.switch_project("A"));
    assert!(state.project_names().is_empty());
}

#[test]
fn clones_share_one_session() {
    let runtime = test_runtime();
    let session = echo_session();
    let other = session.state.clone();

    other.set_provider(LlmProviderKind::HuggingFace);
    assert_eq!(other.toggle_research_mode(), Some(true));
    let outcome = runtime.block_on(session.state.send_user_message("from the first handle"));

    assert_eq!(outcome.response, "huggingface #1");
    let requests = session.huggingface.requests.lock();
    assert_eq!(requests[0].model, "huggingface-research");
    assert_eq!(requests[0].params.max_output_tokens, 1500);
    assert!(session.openai.requests.lock().is_empty());
    assert_eq!(other.active_messages().len(), 2);
}

#[test]
fn long_conversation_forwards_recent_history() {
    let runtime = test_runtime();
    let session = echo_session();
    for idx in 0..8 {
        runtime.block_on(session.state.send_user_message(&format!("question {idx}")));
    }

    let requests = session.openai.requests.lock();
    let last = requests.last().expect("request");
    assert_eq!(last.history.len(), 10);
    assert_eq!(last.history[0].role, MessageRole::Assistant);
    assert_eq!(last.history[1], ChatMessage::user("question 3"));
    assert_eq!(last.history.last(), Some(&ChatMessage::user("question 7")));
    assert_eq!(last.user_message, "question 7");
    assert_eq!(session.state.active_summary().map(|s| s.message_count), Some(16));
}

#[test]
fn clear_resets_only_the_active_project() {
    let runtime = test_runtime();
    let session = echo_session();
    let state = &session.state;
    runtime.block_on(state.send_user_message("keep me"));
    state.create_project("Scratch");
    state.switch_project("Scratch");
    runtime.block_on(state.send_user_message("drop me"));

    assert!(state.clear_active());
    assert!(state.active_messages().is_empty());
    let counts: Vec<usize> = state
        .project_summaries()
        .into_iter()
        .map(|summary| summary.message_count)
        .collect();
    assert_eq!(counts, vec![2, 0]);
}
