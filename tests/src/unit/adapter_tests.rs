use crate::support::http::{CannedReply, FakeServer};
use crate::support::test_runtime;
use std::sync::Arc;
use std::time::Duration;
use tutor_core::config::ProviderSettings;
use tutor_core::llm::{HuggingFaceAdapter, OpenAiChatAdapter};
use tutor_core::{
    AppState, BackendDispatcher, ChatMessage, DispatchOutcome, LlmProviderKind, MessageRole,
    StaticKnowledgeBase,
};

const CHAT_OK: &str =
    r#"{"choices":[{"message":{"role":"assistant","content":"  Use [[wikilinks]] to connect notes.  "}}]}"#;

fn settings(kind: LlmProviderKind, base_url: String, api_key: Option<&str>) -> ProviderSettings {
    let mut settings = ProviderSettings::defaults_for(kind);
    settings.base_url = base_url;
    settings.api_key = api_key.map(str::to_string);
    settings
}

fn dispatcher(
    openai: ProviderSettings,
    huggingface: ProviderSettings,
    timeout: Duration,
) -> BackendDispatcher {
    BackendDispatcher::new(
        Arc::new(StaticKnowledgeBase::builtin()),
        Arc::new(OpenAiChatAdapter::new(&openai, timeout).expect("openai client")),
        Arc::new(HuggingFaceAdapter::new(&huggingface, timeout).expect("hf client")),
    )
}

fn chat_dispatcher(server: &FakeServer, timeout: Duration) -> BackendDispatcher {
    dispatcher(
        settings(
            LlmProviderKind::OpenAi,
            format!("{}/v1", server.base_url()),
            Some("sk-test"),
        ),
        ProviderSettings::defaults_for(LlmProviderKind::HuggingFace),
        timeout,
    )
}

fn history(len: usize) -> Vec<ChatMessage> {
    (0..len)
        .map(|idx| {
            let role = if idx % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            ChatMessage::new(role, format!("turn {idx}"))
        })
        .collect()
}

#[test]
fn chat_adapter_sends_truncated_research_request() {
    let runtime = test_runtime();
    let server = runtime.block_on(FakeServer::start(CannedReply::json(200, CHAT_OK)));
    let dispatcher = chat_dispatcher(&server, Duration::from_secs(5));

    let outcome = runtime.block_on(dispatcher.dispatch(
        LlmProviderKind::OpenAi,
        "latest question",
        &history(15),
        true,
    ));
    assert_eq!(
        outcome,
        DispatchOutcome::success("Use [[wikilinks]] to connect notes.")
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(request.body["model"], "gpt-4");
    assert_eq!(request.body["max_tokens"], 2500);
    assert_eq!(request.body["temperature"], 0.5);

    let messages = request.body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 12);
    assert_eq!(messages[0]["role"], "system");
    let system = messages[0]["content"].as_str().expect("system prompt");
    assert!(system.starts_with("You are working in DEEP RESEARCH MODE"));
    assert!(system.contains("=== KNOWLEDGE BASE ===\n=== YOUR ROLE ==="));
    assert_eq!(messages[1]["content"], "turn 5");
    assert_eq!(messages[10]["content"], "turn 14");
    assert_eq!(messages[11]["role"], "user");
    assert_eq!(messages[11]["content"], "latest question");
}

#[test]
fn chat_adapter_normal_mode_parameters() {
    let runtime = test_runtime();
    let server = runtime.block_on(FakeServer::start(CannedReply::json(200, CHAT_OK)));
    let dispatcher = chat_dispatcher(&server, Duration::from_secs(5));

    runtime.block_on(dispatcher.dispatch(LlmProviderKind::OpenAi, "quick", &[], false));

    let body = &server.requests()[0].body;
    assert_eq!(body["model"], "gpt-3.5-turbo");
    assert_eq!(body["max_tokens"], 1000);
    let temperature = body["temperature"].as_f64().expect("temperature");
    assert!((temperature - 0.7).abs() < 1e-6);
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
}

#[test]
fn provider_failures_are_classified() {
    let cases = [
        (401, r#"{"error":{"message":"Incorrect API key provided"}}"#, "Invalid OpenAI API key"),
        (
            429,
            r#"{"error":{"code":"insufficient_quota","message":"You exceeded your current quota"}}"#,
            "https://platform.openai.com/account/billing",
        ),
        (503, r#"{"error":"overloaded"}"#, "status 503"),
        (200, r#"{"unexpected":true}"#, "API error"),
    ];
    let runtime = test_runtime();
    for (status, body, expected) in cases {
        let server = runtime.block_on(FakeServer::start(CannedReply::json(status, body)));
        let dispatcher = chat_dispatcher(&server, Duration::from_secs(5));
        let outcome =
            runtime.block_on(dispatcher.dispatch(LlmProviderKind::OpenAi, "hi", &[], false));
        assert!(!outcome.success, "status {status} should fail");
        assert!(
            outcome.response.contains(expected),
            "status {status}: {:?} missing {expected}",
            outcome.response
        );
    }
}

#[test]
fn slow_provider_times_out() {
    let runtime = test_runtime();
    let server = runtime.block_on(FakeServer::start(
        CannedReply::json(200, CHAT_OK).delayed(Duration::from_secs(3)),
    ));
    let dispatcher = chat_dispatcher(&server, Duration::from_millis(200));

    let outcome =
        runtime.block_on(dispatcher.dispatch(LlmProviderKind::OpenAi, "hello?", &[], false));
    assert!(!outcome.success);
    assert!(outcome.response.contains("timed out"), "{}", outcome.response);
    assert!(outcome.response.contains("within 200ms"), "{}", outcome.response);
}

#[test]
fn completion_adapter_round_trip() {
    let runtime = test_runtime();
    let server = runtime.block_on(FakeServer::start(CannedReply::json(
        200,
        r#"[{"generated_text":"  Try the Templater plugin.\n"}]"#,
    )));
    let dispatcher = dispatcher(
        ProviderSettings::defaults_for(LlmProviderKind::OpenAi),
        settings(LlmProviderKind::HuggingFace, server.base_url(), Some("hf-test")),
        Duration::from_secs(5),
    );

    let outcome = runtime.block_on(dispatcher.dispatch(
        LlmProviderKind::HuggingFace,
        "How do templates work?",
        &history(15),
        false,
    ));
    assert_eq!(outcome, DispatchOutcome::success("Try the Templater plugin."));

    let request = &server.requests()[0];
    assert_eq!(request.path, "/models/microsoft/DialoGPT-medium");
    assert_eq!(request.authorization.as_deref(), Some("Bearer hf-test"));
    assert_eq!(request.body["parameters"]["max_length"], 500);
    assert_eq!(request.body["parameters"]["return_full_text"], false);
    let inputs = request.body["inputs"].as_str().expect("inputs");
    assert!(inputs.starts_with("You are an expert Obsidian assistant"));
    assert!(inputs.contains("=== CONVERSATION ===\n\nAssistant: turn 5\nUser: turn 6\n"));
    assert!(!inputs.contains("turn 4\n"));
    assert!(inputs.ends_with("User: How do templates work?\nAssistant: "));
}

#[test]
fn missing_credential_skips_the_network() {
    let runtime = test_runtime();
    let server = runtime.block_on(FakeServer::start(CannedReply::json(200, "[]")));
    let dispatcher = dispatcher(
        settings(LlmProviderKind::OpenAi, server.base_url(), None),
        settings(LlmProviderKind::HuggingFace, server.base_url(), None),
        Duration::from_secs(5),
    );

    for (kind, variable) in [
        (LlmProviderKind::OpenAi, "OPENAI_API_KEY"),
        (LlmProviderKind::HuggingFace, "HF_API_KEY"),
    ] {
        let outcome = runtime.block_on(dispatcher.dispatch(kind, "hi", &[], false));
        assert!(!outcome.success);
        assert!(outcome.response.contains(variable), "{}", outcome.response);
    }
    assert!(server.requests().is_empty());
}

#[test]
fn session_records_http_reply() {
    let runtime = test_runtime();
    let server = runtime.block_on(FakeServer::start(CannedReply::json(200, CHAT_OK)));
    let state = AppState::new(
        chat_dispatcher(&server, Duration::from_secs(5)),
        LlmProviderKind::OpenAi,
    );

    let outcome = runtime.block_on(state.send_user_message("How do I link notes?"));
    assert!(outcome.success);
    assert_eq!(
        state.active_messages(),
        vec![
            ChatMessage::user("How do I link notes?"),
            ChatMessage::assistant("Use [[wikilinks]] to connect notes."),
        ]
    );
}
