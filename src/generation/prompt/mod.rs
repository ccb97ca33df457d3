
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievedChunk;

const PREAMBLE: &str =
    "You are an expert AI assistant helping users understand concepts in artificial intelligence.";
const CHAIN_OF_THOUGHT: &str = "Respond by thinking through the answer step by step.";

/// How the answer should be phrased
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStyle {
    #[default]
    Default,
    Concise,
    BeginnerFriendly,
    StepByStep,
    CitationsOnly,
}

impl PromptStyle {
    #[inline]
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Default => "Answer the question using the context provided.",
            Self::Concise => "Answer briefly and directly using only relevant context.",
            Self::BeginnerFriendly => {
                "Explain clearly as if to someone new to AI. Use simple language."
            }
            Self::StepByStep => "Answer the question by explaining your reasoning step by step.",
            Self::CitationsOnly => {
                "Answer using only the information provided in the sources below. Cite them clearly throughout your response."
            }
        }
    }
}

/// Assemble the answer prompt from the question, its sources and prior exchanges.
///
/// Sources are numbered from 1 in the order given, so `[Source 1]` is the
/// closest match.
#[inline]
pub fn build_prompt(
    question: &str,
    sources: &[RetrievedChunk],
    style: PromptStyle,
    memory_block: &str,
    cot: bool,
) -> String {
    let context = sources
        .iter()
        .enumerate()
        .map(|(number, source)| {
            format!(
                "\n[Source {}] Title: {}\n{}\nURL: {}\n",
                number + 1,
                source.metadata.title,
                source.chunk,
                source.metadata.url
            )
        })
        .collect::<String>();

    let cot_line = if cot {
        format!("\n{}", CHAIN_OF_THOUGHT)
    } else {
        String::new()
    };

    format!(
        "{}\n\n{}{}\n{}\n\nQuestion: {}\n\nContext:\n{}\n\nAnswer:",
        PREAMBLE,
        style.instruction(),
        cot_line,
        memory_block,
        question,
        context
    )
}

/// Ask for a short justification of `answer` against the prompt it came from
#[inline]
pub fn build_explanation_prompt(answer: &str, prompt: &str) -> String {
    format!(
        "You are a helpful AI tutor. Briefly explain why the following answer is accurate, \
         based on the context it was built from.\n\n\
         Answer:\n{}\n\n\
         Context:\n{}\n\n\
         Explain why this answer makes sense:",
        answer, prompt
    )
}
