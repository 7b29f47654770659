//! Prompt assembly.
//!
//! The upstream receives one flat prompt: every loaded history turn on its
//! own line (`User: ...` / `Assistant: ...`) followed by the new message
//! verbatim. There is no windowing beyond the turn limit applied at load.

use chatrelay_types::chat::Turn;

/// Join history turns and the new message into the prompt text.
pub fn build_prompt(history: &[Turn], message: &str) -> String {
    let mut lines: Vec<String> = history.iter().map(ToString::to_string).collect();
    lines.push(message.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_history_is_message() {
        assert_eq!(build_prompt(&[], "Hi"), "Hi");
    }

    #[test]
    fn test_prompt_places_history_before_message() {
        let history = vec![Turn::user("Hi"), Turn::assistant("Hello there")];
        let prompt = build_prompt(&history, "How are you?");
        assert_eq!(prompt, "User: Hi\nAssistant: Hello there\nHow are you?");
    }

    #[test]
    fn test_prompt_keeps_multiline_content() {
        let history = vec![Turn::assistant("line one\nline two")];
        let prompt = build_prompt(&history, "next");
        assert_eq!(prompt, "Assistant: line one\nline two\nnext");
    }
}
