use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, GeneratedContent};

/// Append-only conversation history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Starter questions offered once a result is on screen.
pub fn suggested_questions(content: &GeneratedContent) -> Vec<String> {
    let title = &content.title;
    vec![
        format!("Explain the key findings of \"{title}\" in simpler terms."),
        format!("What are the limitations of the study on \"{title}\"?"),
        format!("Who would benefit most from the results of \"{title}\"?"),
        format!("What are the practical applications of \"{title}\"?"),
    ]
}
