use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::embeddings::{Embedder, EmbeddingClient};
use crate::generation::{
    ChatClient, ConversationMemory, Generated, PromptStyle, build_prompt,
};
use crate::retrieval::{IndexManifest, KnowledgeBase, Retrieval, truncate_chars};
use crate::upload::{
    Section, compose_query, read_text_file, select_section, split_sections, title_sections,
};

const PREVIEW_CHARS: usize = 200;

/// One question as the answer pipeline sees it
#[derive(Debug, Clone)]
pub struct Question<'a> {
    pub text: &'a str,
    /// Uploaded section the question is anchored to
    pub section: Option<&'a str>,
    pub style: PromptStyle,
    pub cot: bool,
}

/// Everything produced while answering a question
#[derive(Debug, Clone)]
pub struct Answer {
    pub prompt: String,
    pub retrieval: Retrieval,
    pub answer: Generated,
    pub explanation: Generated,
}

/// Options of the `ask` command
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,
    pub style: PromptStyle,
    pub cot: bool,
    pub upload: Option<PathBuf>,
    pub section: Option<usize>,
    pub show_prompt: bool,
    pub top_k: Option<usize>,
}

/// Retrieve sources for a question, prompt the chat model and explain the answer
#[inline]
pub fn answer_question<E: Embedder>(
    knowledge_base: &KnowledgeBase<E>,
    chat: &ChatClient,
    question: &Question<'_>,
    memory: &ConversationMemory,
    top_k: usize,
) -> Result<Answer> {
    let query = compose_query(question.section, question.text);

    let retrieval = knowledge_base
        .retrieve(&query, top_k)
        .context("Failed to retrieve sources")?;
    if retrieval.used_fallback() {
        warn!("Query could not be embedded; sources are unranked");
    }

    let prompt = build_prompt(
        &query,
        &retrieval.hits,
        question.style,
        &memory.format_prompt(),
        question.cot,
    );

    let answer = chat.generate_answer(&prompt);
    let explanation = chat.explain_answer(answer.text(), &prompt);

    Ok(Answer {
        prompt,
        retrieval,
        answer,
        explanation,
    })
}

/// Embed the configured corpus and persist the index
#[inline]
pub fn build_index(config: &Config) -> Result<()> {
    let embedder = embedding_client(config)?;

    println!(
        "Building index from {}",
        style(config.dataset_path().display()).cyan()
    );

    let knowledge_base =
        KnowledgeBase::build(config, embedder).context("Failed to build the index")?;

    println!(
        "{}",
        style(format!(
            "✓ Indexed {} chunks",
            knowledge_base.len()
        ))
        .green()
    );
    println!("  Index: {}", config.index_path().display());
    println!(
        "  Manifest: {}",
        IndexManifest::path_for(&config.index_path()).display()
    );

    Ok(())
}

/// Print the chunks closest to `query`
#[inline]
pub fn search(config: &Config, query: &str, top_k: Option<usize>) -> Result<()> {
    let knowledge_base = open_knowledge_base(config)?;
    let k = top_k.unwrap_or(config.retrieval.top_k);

    let retrieval = knowledge_base
        .retrieve(query, k)
        .context("Failed to search the index")?;

    if retrieval.used_fallback() {
        println!(
            "{}",
            style("⚠ The query could not be embedded; results are not ranked by meaning").yellow()
        );
    }

    if retrieval.hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, hit) in retrieval.hits.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            style(&hit.metadata.title).bold(),
            style(format!("(distance {:.4})", hit.distance)).dim()
        );
        println!("   {}", style(&hit.metadata.url).cyan());
        println!("   {}", preview(&hit.chunk));
        println!();
    }

    Ok(())
}

/// Answer one question and print the answer, its sources and an explanation
#[inline]
pub fn ask(config: &Config, options: &AskOptions) -> Result<()> {
    let knowledge_base = open_knowledge_base(config)?;
    let chat = chat_client(config)?;

    let section = match &options.upload {
        Some(path) => {
            let sections = load_sections(config, path, &chat)?;
            let number = options.section.unwrap_or(1);
            let section = select_section(&sections, number)?;
            println!(
                "Using section {}: {}",
                section.number,
                style(&section.title).cyan()
            );
            Some(section.text.clone())
        }
        None => None,
    };

    let question = Question {
        text: &options.question,
        section: section.as_deref(),
        style: options.style,
        cot: options.cot,
    };
    let top_k = options.top_k.unwrap_or(config.retrieval.top_k);

    let answer = answer_question(
        &knowledge_base,
        &chat,
        &question,
        &ConversationMemory::new(0),
        top_k,
    )?;

    print_answer(&answer, options.show_prompt);
    Ok(())
}

/// Interactive question loop that remembers recent exchanges
#[inline]
pub fn chat_session(config: &Config, prompt_style: PromptStyle, cot: bool) -> Result<()> {
    let knowledge_base = open_knowledge_base(config)?;
    let chat = chat_client(config)?;
    let mut memory = ConversationMemory::new(config.retrieval.memory_size);

    eprintln!(
        "{}",
        style("Ask a question, or press enter on an empty line to quit.").dim()
    );

    loop {
        let line: String = Input::new()
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()?;
        let text = line.trim();
        if text.is_empty() || text == "exit" || text == "quit" {
            break;
        }

        let question = Question {
            text,
            section: None,
            style: prompt_style,
            cot,
        };
        let answer = answer_question(
            &knowledge_base,
            &chat,
            &question,
            &memory,
            config.retrieval.top_k,
        )?;

        print_answer(&answer, false);

        if let Generated::Completed(reply) = &answer.answer {
            memory.push(text, reply.as_str());
        }
    }

    info!("Chat session ended after {} remembered exchanges", memory.len());
    Ok(())
}

/// Print the numbered, titled sections of an uploaded file
#[inline]
pub fn list_sections(config: &Config, path: &Path) -> Result<()> {
    let chat = chat_client(config)?;
    let sections = load_sections(config, path, &chat)?;

    for section in &sections {
        println!(
            "Section {}: {}",
            section.number,
            style(&section.title).bold()
        );
        println!("   {}", style(preview(&section.text)).dim());
    }

    println!();
    println!(
        "Use {} to ask about one of them.",
        style("ask --upload <FILE> --section <N>").cyan()
    );
    Ok(())
}

/// Show where the corpus and index live and how the index was built
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    let dataset_path = config.dataset_path();
    let index_path = config.index_path();

    println!("{}", style("📋 Knowledge Base Status").bold().cyan());
    println!();
    println!(
        "  Corpus: {} {}",
        dataset_path.display(),
        presence(dataset_path.exists())
    );
    println!(
        "  Index:  {} {}",
        index_path.display(),
        presence(index_path.exists())
    );

    match IndexManifest::load(&index_path)? {
        Some(manifest) => {
            println!();
            println!("{}", style("Index Manifest:").bold().yellow());
            println!(
                "  Built: {}",
                manifest.built_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("  Model: {}", manifest.model);
            println!("  Dimension: {}", manifest.dimension);
            println!("  Chunks: {}", manifest.chunk_count);
            println!("  Chunk Size: {} words", manifest.chunk_size);
            println!("  Corpus: {}", manifest.corpus_path.display());

            if manifest.model != config.embedding.model {
                println!(
                    "{}",
                    style(format!(
                        "⚠ Configured embedding model is {}; rebuild to switch",
                        config.embedding.model
                    ))
                    .yellow()
                );
            }
            if manifest.chunk_size != config.chunking.corpus_chunk_size {
                println!(
                    "{}",
                    style(format!(
                        "⚠ Configured chunk size is {}; rebuild before querying",
                        config.chunking.corpus_chunk_size
                    ))
                    .yellow()
                );
            }
            if manifest.corpus_path != dataset_path {
                println!(
                    "{}",
                    style("⚠ Configured corpus differs from the indexed one; rebuild before querying")
                        .yellow()
                );
            }
        }
        None if index_path.exists() => {
            println!();
            println!("{}", style("No manifest found next to the index.").yellow());
        }
        None => {
            println!();
            println!("Run {} to create the index.", style("ai-knower build").cyan());
        }
    }

    Ok(())
}

fn embedding_client(config: &Config) -> Result<EmbeddingClient> {
    let api_key = config.api_key()?;
    EmbeddingClient::new(config, api_key)
}

fn chat_client(config: &Config) -> Result<ChatClient> {
    let api_key = config.api_key()?;
    ChatClient::new(config, api_key)
}

fn open_knowledge_base(config: &Config) -> Result<KnowledgeBase<EmbeddingClient>> {
    let embedder = embedding_client(config)?;
    KnowledgeBase::open(config, embedder).context("Failed to open the knowledge base")
}

fn load_sections(config: &Config, path: &Path, chat: &ChatClient) -> Result<Vec<Section>> {
    let text = read_text_file(path)?;
    let chunks = split_sections(&text, &config.chunking)
        .with_context(|| format!("Failed to split {}", path.display()))?;
    Ok(title_sections(chunks, chat))
}

fn print_answer(answer: &Answer, show_prompt: bool) {
    println!();
    println!("{}", style("📚 Answer").bold().cyan());
    println!("{}", answer.answer.text());
    if let Generated::Fallback { reason, .. } = &answer.answer {
        println!("{}", style(format!("({})", reason)).dim());
    }

    println!();
    println!("{}", style("🔗 Sources").bold().yellow());
    for (number, hit) in answer.retrieval.hits.iter().enumerate() {
        println!(
            "  {}. {} ({})",
            number + 1,
            hit.metadata.title,
            style(&hit.metadata.url).cyan()
        );
    }

    println!();
    println!("{}", style("🤔 Why this answer?").bold().yellow());
    println!("{}", answer.explanation.text());

    if show_prompt {
        println!();
        println!("{}", style("🧩 Full Prompt").bold().yellow());
        println!("{}", answer.prompt);
    }
    println!();
}

fn preview(text: &str) -> String {
    let cut = truncate_chars(text, PREVIEW_CHARS);
    if cut.len() < text.len() {
        format!("{}…", cut)
    } else {
        cut.to_string()
    }
}

fn presence(exists: bool) -> console::StyledObject<&'static str> {
    if exists {
        style("(present)").green()
    } else {
        style("(missing)").red()
    }
}
