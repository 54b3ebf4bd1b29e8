//! Conversation context: turn counting, caller identity, agent prompts.

use crate::chat::types::HistoryMessage;

const USER_ID_MARKER: &str = "User ID:";

/// User-authored messages in the conversation, the current one included.
pub fn count_user_messages(history: &[HistoryMessage]) -> usize {
    1 + history.iter().filter(|m| m.role == "user").count()
}

/// Caller identity from the first system message carrying a `User ID:` marker.
///
/// Only string content is searched. The identity runs from the marker to the next `.` (or end of content),
/// trimmed. A marker followed by nothing yields `None`.
pub fn extract_user_identity(history: &[HistoryMessage]) -> Option<String> {
    let content = history
        .iter()
        .filter(|m| m.role == "system")
        .filter_map(HistoryMessage::text)
        .find_map(|content| content.split_once(USER_ID_MARKER).map(|(_, rest)| rest))?;

    let id = content.split('.').next().unwrap_or_default().trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Agent instruction naming the tool server and, when known, the caller.
pub fn build_instruction(server: &str, identity: Option<&str>) -> String {
    let mut instruction = format!(
        "You are a helpful assistant. Maintain context from the conversation history provided. \
         You can use the {server} tool to get information about the tasks and their status."
    );
    match identity {
        Some(id) => instruction.push_str(&format!(
            " The user ID is: {id}. Use this user ID when calling {server} tools."
        )),
        None => instruction.push_str(
            " No user ID was provided for this conversation, so tools may not work properly. \
             If a tool needs a user ID, tell the user it is unavailable instead of guessing.",
        ),
    }
    instruction
}

/// Message handed to the agent: prior turns as plain text, then the new one.
pub fn build_agent_message(history: &[HistoryMessage], message: &str, include_context: bool) -> String {
    if !include_context || history.is_empty() {
        return format!("User: {message}");
    }

    let mut out = String::from("Previous conversation:\n");
    for entry in history {
        out.push_str(&entry.role);
        out.push_str(": ");
        out.push_str(&entry.display_content());
        out.push('\n');
    }
    out.push('\n');
    out.push_str("User: ");
    out.push_str(message);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> HistoryMessage {
        HistoryMessage::new(role, content)
    }

    #[test]
    fn test_count_includes_current_message() {
        assert_eq!(count_user_messages(&[]), 1);
        let history = vec![
            msg("system", "User ID: u1."),
            msg("user", "a"),
            msg("assistant", "b"),
            msg("user", "c"),
        ];
        assert_eq!(count_user_messages(&history), 3);
    }

    #[test]
    fn test_identity_extraction() {
        let history = vec![msg("system", "User ID: abc123. Do X")];
        assert_eq!(extract_user_identity(&history).as_deref(), Some("abc123"));

        let history = vec![msg("system", "You are helpful.")];
        assert_eq!(extract_user_identity(&history), None);
    }

    #[test]
    fn test_identity_only_from_system_messages() {
        let history = vec![
            msg("user", "User ID: spoofed. hi"),
            msg("system", "Context only"),
            msg("system", "User ID: real-id. When listing tasks..."),
            msg("system", "User ID: later."),
        ];
        assert_eq!(extract_user_identity(&history).as_deref(), Some("real-id"));
    }

    #[test]
    fn test_identity_without_period_or_value() {
        assert_eq!(
            extract_user_identity(&[msg("system", "User ID:  xyz ")]).as_deref(),
            Some("xyz")
        );
        assert_eq!(extract_user_identity(&[msg("system", "User ID: . rest")]), None);
    }

    #[test]
    fn test_non_string_content() {
        let history: Vec<HistoryMessage> = serde_json::from_value(serde_json::json!([
            {"role": "system", "content": ["User ID: hidden."]},
            {"role": "system", "content": "User ID: u7. Be brief."},
            {"role": "user", "content": [{"type": "text", "text": "hi"}]},
            {"role": "assistant", "content": null}
        ]))
        .unwrap();

        assert_eq!(extract_user_identity(&history).as_deref(), Some("u7"));
        assert_eq!(count_user_messages(&history), 2);
        assert_eq!(
            build_agent_message(&history[2..], "next", true),
            "Previous conversation:\nuser: [{\"text\":\"hi\",\"type\":\"text\"}]\nassistant: \n\nUser: next"
        );
    }

    #[test]
    fn test_instruction_with_and_without_identity() {
        let with = build_instruction("GramTaskboard", Some("abc123"));
        assert!(with.contains("GramTaskboard tool"));
        assert!(with.contains("The user ID is: abc123. Use this user ID when calling GramTaskboard tools."));
        assert!(!with.contains("may not work"));

        let without = build_instruction("GramTaskboard", None);
        assert!(without.contains("tools may not work properly"));
        assert!(!without.contains("The user ID is"));
    }

    #[test]
    fn test_agent_message_with_history() {
        let history = vec![msg("user", "hi"), msg("assistant", "hello")];
        assert_eq!(
            build_agent_message(&history, "list my tasks", true),
            "Previous conversation:\nuser: hi\nassistant: hello\n\nUser: list my tasks"
        );
        assert_eq!(build_agent_message(&history, "list my tasks", false), "User: list my tasks");
        assert_eq!(build_agent_message(&[], "hey", true), "User: hey");
    }
}
