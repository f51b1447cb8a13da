//! Question/answer history for an interactive session.

use std::fmt;

/// One exchange in a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

/// Append-only log of the turns in the current session.
///
/// Lives only as long as the session; nothing is written to disk.
#[derive(Debug, Default)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn { question: question.into(), answer: answer.into() });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Forget every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

impl fmt::Display for ChatHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.turns.is_empty() {
            return writeln!(f, "(no questions yet)");
        }
        for (i, turn) in self.turns.iter().enumerate() {
            writeln!(f, "[{}] Q: {}", i + 1, turn.question)?;
            writeln!(f, "    A: {}", turn.answer.trim())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turns_are_kept_in_order() {
        let mut history = ChatHistory::new();
        history.push("What is a pod?", "A group of containers.");
        history.push("What is a node?", "A worker machine.");

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[1].question, "What is a node?");

        let rendered = history.to_string();
        assert!(rendered.starts_with("[1] Q: What is a pod?\n"));
        assert!(rendered.contains("[2] Q: What is a node?\n    A: A worker machine.\n"));
    }

    #[test]
    fn clear_empties_history() {
        let mut history = ChatHistory::new();
        history.push("q", "a");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.to_string(), "(no questions yet)\n");
    }
}
