// Answer generation
// Prompt assembly, conversation memory and the chat completion client

pub mod chat;
pub mod memory;
pub mod prompt;

pub use chat::{ChatClient, Generated};
pub use memory::{ConversationMemory, Exchange};
pub use prompt::{PromptStyle, build_explanation_prompt, build_prompt};
