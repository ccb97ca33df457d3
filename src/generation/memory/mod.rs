
use std::collections::VecDeque;

use crate::config::settings::DEFAULT_MEMORY_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

/// The most recent question/answer pairs of a session, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMemory {
    capacity: usize,
    exchanges: VecDeque<Exchange>,
}

impl Default for ConversationMemory {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl ConversationMemory {
    /// A capacity of 0 keeps nothing
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            exchanges: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }

        while self.exchanges.len() >= self.capacity {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            question: question.into(),
            answer: answer.into(),
        });
    }

    #[inline]
    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    /// Render the remembered exchanges as a prompt block; empty when nothing is remembered
    #[inline]
    pub fn format_prompt(&self) -> String {
        if self.exchanges.is_empty() {
            return String::new();
        }

        let formatted = self
            .exchanges
            .iter()
            .map(|exchange| {
                format!(
                    "Previous Q: {}\nPrevious A: {}",
                    exchange.question, exchange.answer
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!("\n\n[CONTEXT FROM PAST INTERACTIONS]\n{}", formatted)
    }
}
