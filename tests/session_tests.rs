//! Session store and history repair invariants

use serde_json::Map;

use finorch::agent::{sanitize, Message, Role, SessionConfig, SessionStore, ToolCall};

fn store(capacity: usize) -> SessionStore {
    SessionStore::new(SessionConfig {
        capacity,
        system_prompt: "You are a test advisor.".into(),
    })
}

fn tool_request(id: &str) -> Message {
    Message::assistant_with_tools("", vec![ToolCall::new(id, "calculate_emi", Map::new())])
}

/// Every tool message directly follows an assistant message that requested tools
fn assert_no_orphans(history: &[Message]) {
    for (i, message) in history.iter().enumerate() {
        if message.role == Role::Tool {
            assert!(i > 0, "tool message at index 0");
            assert!(
                history[i - 1].requests_tools(),
                "tool message at {} follows {:?}",
                i,
                history[i - 1].role
            );
        }
    }
}

#[test]
fn test_capacity_overflow_keeps_system_and_repairs() {
    let store = store(20);

    // system + 24 appends = 25 entries before trimming
    for turn in 0..8 {
        let id = format!("call_{}", turn);
        store.append("s1", Message::user(format!("question {}", turn)));
        store.append("s1", tool_request(&id));
        store.append("s1", Message::tool(id, "{\"emi\": 1}"));
        let raw = store.raw_history("s1").unwrap();
        assert!(raw.len() <= 20);
        assert_eq!(raw[0], Message::system("You are a test advisor."));
        assert_no_orphans(&raw);
    }

    // A trim split a request from its result; repair dropped the result
    let raw = store.raw_history("s1").unwrap();
    assert_eq!(raw.len(), 19);
    assert_eq!(raw.last().unwrap().tool_call_id.as_deref(), Some("call_7"));

    store.append("s1", Message::assistant("summary"));
    let raw = store.raw_history("s1").unwrap();
    assert_eq!(raw.len(), 20);
    assert_eq!(raw[0].role, Role::System);
    assert_no_orphans(&raw);
}

#[test]
fn test_cut_between_request_and_result_drops_result() {
    let store = store(4);
    store.append("s1", Message::user("q"));
    store.append("s1", tool_request("c1"));
    store.append("s1", Message::tool("c1", "r1"));
    store.append("s1", Message::assistant("done"));
    // Pushes the request out of the window; its result must go too
    store.append("s1", Message::user("next"));

    let raw = store.raw_history("s1").unwrap();
    assert_no_orphans(&raw);
    assert_eq!(raw[0].role, Role::System);
    assert!(raw.iter().all(|m| m.role != Role::Tool));
    assert_eq!(raw.last().unwrap().content, "next");
}

#[test]
fn test_read_view_is_repaired_and_idempotent() {
    let store = store(20);
    store.append("s1", Message::tool("stray", "orphan"));
    store.append("s1", Message::user("hi"));

    let clean = store.get("s1");
    assert_no_orphans(&clean);
    assert_eq!(clean.len(), 2);
    assert_eq!(sanitize(&clean), clean);

    // The raw history is left as appended
    assert_eq!(store.raw_history("s1").unwrap().len(), 3);
}

#[test]
fn test_adjacency_rule_ignores_ids() {
    let history = vec![
        Message::system("s"),
        tool_request("c1"),
        Message::tool("unrelated-id", "kept"),
        Message::tool("c1", "dropped"),
    ];
    let clean = sanitize(&history);
    assert_eq!(clean.len(), 3);
    assert_eq!(clean[2].content, "kept");
}

#[test]
fn test_clear_resets_session() {
    let store = store(20);
    store.append("s1", Message::user("hello"));
    assert!(store.clear("s1"));
    assert_eq!(store.get("s1"), vec![Message::system("You are a test advisor.")]);
}
