use crate::models::chat::{ ChatMessage, Role };

/// Shown in place of a reply when a turn fails for any reason.
pub const TURN_ERROR_MESSAGE: &str =
    "I'm sorry, but I encountered an error. Please try again later.";

/// Client-side conversation state. One turn may be in flight at a time; the
/// `sending` gate makes repeated submissions a no-op rather than a queue.
///
/// All updates are expressed as replace-last operations on the message list
/// so the state stays a plain value that tests can drive directly.
#[derive(Debug, Clone)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    sending: bool,
}

impl ChatSession {
    /// Start a session seeded with the assistant greeting.
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(greeting)],
            sending: false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Begin a user turn. Appends the user message and an empty assistant
    /// placeholder, sets the sending gate, and returns the conversation to
    /// submit (everything up to and including the user turn, placeholder
    /// excluded). Returns `None` when the text is blank or a turn is already
    /// in flight; the session is unchanged in that case.
    pub fn begin_turn(&mut self, text: &str) -> Option<Vec<ChatMessage>> {
        if text.trim().is_empty() || self.sending {
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        let outbound = self.messages.clone();
        self.messages.push(ChatMessage::assistant(""));
        self.sending = true;
        Some(outbound)
    }

    /// Append one decoded text chunk to the in-flight reply by replacing the
    /// last message with an extended copy.
    pub fn apply_chunk(&mut self, text: &str) {
        if let Some(last) = self.messages.pop() {
            self.messages.push(ChatMessage {
                role: last.role,
                content: format!("{}{}", last.content, text),
            });
        }
    }

    /// Mark the in-flight turn as failed. An untouched placeholder is
    /// replaced by the fixed error message; a partially filled reply stays
    /// visible and the error message is appended after it.
    pub fn fail_turn(&mut self) {
        let placeholder_empty = matches!(
            self.messages.last(),
            Some(m) if m.role == Role::Assistant && m.content.is_empty()
        );
        if placeholder_empty {
            self.messages.pop();
        }
        self.messages.push(ChatMessage::assistant(TURN_ERROR_MESSAGE));
        self.sending = false;
    }

    /// Release the sending gate after the reply stream resolved.
    pub fn finish_turn(&mut self) {
        self.sending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_starts_with_greeting() {
        let session = ChatSession::new("Welcome!");
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0], ChatMessage::assistant("Welcome!"));
        assert!(!session.is_sending());
    }

    #[test]
    fn test_begin_turn_appends_user_and_placeholder() {
        let mut session = ChatSession::new("Welcome!");
        let outbound = session.begin_turn("hello").unwrap();

        // Outbound includes the new user turn but not the placeholder.
        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound[1], ChatMessage::user("hello"));

        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[2], ChatMessage::assistant(""));
        assert!(session.is_sending());
    }

    #[test]
    fn test_blank_submission_is_noop() {
        let mut session = ChatSession::new("Welcome!");
        assert!(session.begin_turn("   ").is_none());
        assert!(session.begin_turn("").is_none());
        assert_eq!(session.messages().len(), 1);
        assert!(!session.is_sending());
    }

    #[test]
    fn test_submission_while_sending_is_noop() {
        let mut session = ChatSession::new("Welcome!");
        session.begin_turn("first").unwrap();
        assert!(session.begin_turn("second").is_none());
        assert_eq!(session.messages().len(), 3);
    }

    #[test]
    fn test_successful_turn_grows_conversation_by_two() {
        let mut session = ChatSession::new("Welcome!");
        let before = session.messages().len();

        session.begin_turn("hello").unwrap();
        session.apply_chunk("Sure");
        session.apply_chunk("! ");
        session.apply_chunk("Let's plan.");
        session.finish_turn();

        assert_eq!(session.messages().len(), before + 2);
        let last = session.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Sure! Let's plan.");
        assert!(!session.is_sending());
    }

    #[test]
    fn test_failed_turn_replaces_empty_placeholder_with_error() {
        let mut session = ChatSession::new("Welcome!");
        session.begin_turn("hello").unwrap();
        session.fail_turn();

        let last = session.messages().last().unwrap();
        assert_eq!(last.content, TURN_ERROR_MESSAGE);
        assert!(!session.is_sending());
        // user turn + error message
        assert_eq!(session.messages().len(), 3);
    }

    #[test]
    fn test_failed_turn_keeps_partial_reply_visible() {
        let mut session = ChatSession::new("Welcome!");
        session.begin_turn("hello").unwrap();
        session.apply_chunk("Sure! Let me");
        session.fail_turn();

        let messages = session.messages();
        assert_eq!(messages[messages.len() - 2].content, "Sure! Let me");
        assert_eq!(messages.last().unwrap().content, TURN_ERROR_MESSAGE);
    }
}
