//! Conversation types and state management

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Ephemeral, client-owned chat transcript.
///
/// The first message is always the system instruction the conversation was
/// created with. Nothing here is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: &str) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn with_greeting(mut self, greeting: &str) -> Self {
        self.add_assistant(greeting);
        self
    }

    pub fn add_user(&mut self, content: &str) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant(&mut self, content: &str) {
        self.messages.push(Message::assistant(content));
    }

    /// Append the empty assistant turn that streamed text is written into.
    pub fn add_placeholder(&mut self) {
        self.messages.push(Message::assistant(String::new()));
    }

    /// Replace the content of the trailing assistant message.
    ///
    /// Returns `false` (and leaves the transcript untouched) when the last
    /// message is not an assistant turn.
    pub fn replace_last_assistant(&mut self, content: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant => {
                last.content.clear();
                last.content.push_str(content);
                true
            }
            _ => false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_system_prompt() {
        let conversation = Conversation::new("be kind").with_greeting("hi");
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[0], Message::system("be kind"));
        assert_eq!(conversation.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn test_placeholder_is_filled_in_place() {
        let mut conversation = Conversation::new("sys");
        conversation.add_user("hello");
        conversation.add_placeholder();
        assert!(conversation.replace_last_assistant("He"));
        assert!(conversation.replace_last_assistant("Hello!"));

        assert_eq!(conversation.messages().len(), 3);
        assert_eq!(conversation.messages().last(), Some(&Message::assistant("Hello!")));
    }

    #[test]
    fn test_replace_refuses_non_assistant_tail() {
        let mut conversation = Conversation::new("sys");
        conversation.add_user("hello");
        assert!(!conversation.replace_last_assistant("oops"));
        assert_eq!(conversation.messages().last(), Some(&Message::user("hello")));
    }

    #[test]
    fn test_role_wire_format() {
        let json = serde_json::to_string(&Message::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);

        let parsed: Message = serde_json::from_str(r#"{"role":"system","content":"s"}"#).unwrap();
        assert_eq!(parsed.role, Role::System);
        assert!(serde_json::from_str::<Message>(r#"{"role":"tool","content":"s"}"#).is_err());
    }
}
