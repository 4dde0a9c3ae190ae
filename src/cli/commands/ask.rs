//! Ask and chat command implementations.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{AnswerInfo, OutputFormat, get_formatter};
use crate::models::Config;
use crate::services::{
    ChatClient, ChatTurn, EmbeddingClient, NO_EVIDENCE_REPLY, PineconeIndex, RetrievalGate,
    RetrievalOutcome, SparseEncoderCache,
};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question to ask against the indexed documents")]
    pub question: String,

    #[arg(long, short = 'k', help = "Number of chunks to retrieve")]
    pub top_k: Option<u32>,

    #[arg(long, help = "Minimum best similarity score (0.0-1.0)")]
    pub min_score: Option<f32>,

    #[arg(long, help = "Attach BM25 sparse vectors to the query")]
    pub hybrid: bool,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, help = "Attach BM25 sparse vectors to queries")]
    pub hybrid: bool,
}

/// Build the retrieval gate from configuration plus command-line overrides.
fn build_gate(config: &Config, top_k: Option<u32>, min_score: Option<f32>, hybrid: bool) -> Result<RetrievalGate> {
    let mut retrieval = config.retrieval.clone();
    if let Some(top_k) = top_k {
        retrieval.top_k = top_k;
    }
    if let Some(min_score) = min_score {
        retrieval.similarity_threshold = min_score;
    }
    retrieval.hybrid = retrieval.hybrid || hybrid;

    if retrieval.top_k == 0 {
        anyhow::bail!("top_k must be at least 1");
    }
    if !(0.0..=1.0).contains(&retrieval.similarity_threshold) {
        anyhow::bail!("min_score must be between 0.0 and 1.0");
    }

    let embedder =
        Arc::new(EmbeddingClient::new(&config.embedding).context("embedding client setup failed")?);
    let index =
        Arc::new(PineconeIndex::new(&config.vector_store).context("vector index setup failed")?);
    let sparse_cache = Arc::new(SparseEncoderCache::new(
        config.indexing.bm25_model_path.clone(),
    ));

    Ok(RetrievalGate::new(embedder, index, sparse_cache, retrieval))
}

/// Run one question through the gate and, when evidence is usable, through
/// the generator. The generator is never invoked on insufficient evidence.
async fn answer_question(
    gate: &RetrievalGate,
    chat: &ChatClient,
    question: &str,
    history: &[ChatTurn],
    verbose: bool,
) -> Result<AnswerInfo> {
    let retrieve_start = Instant::now();
    let outcome = gate.retrieve(question).await.context("retrieval failed")?;

    if verbose {
        eprintln!("Retrieval: {}ms", retrieve_start.elapsed().as_millis());
    }

    match outcome {
        RetrievalOutcome::Insufficient { best_score } => {
            if verbose {
                match best_score {
                    Some(score) => eprintln!("Best similarity {:.3} below threshold", score),
                    None => eprintln!("No chunks retrieved"),
                }
            }
            Ok(AnswerInfo {
                answer: NO_EVIDENCE_REPLY.to_string(),
                sources: Vec::new(),
            })
        }
        RetrievalOutcome::Grounded(grounded) => {
            if verbose {
                eprintln!(
                    "Retrieved {} chunks, best similarity {:.3}",
                    grounded.chunks.len(),
                    grounded.best_score
                );
            }
            let answer = chat
                .answer(question, &grounded.context, history)
                .await
                .context("answer generation failed")?;
            Ok(AnswerInfo {
                answer,
                sources: grounded.sources,
            })
        }
    }
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let gate = build_gate(&config, args.top_k, args.min_score, args.hybrid)?;
    let chat = ChatClient::new(&config.chat).context("chat client setup failed")?;

    let answer = answer_question(&gate, &chat, question, &[], verbose).await?;
    print!("{}", formatter.format_answer(&answer));

    Ok(())
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let gate = build_gate(&config, None, None, args.hybrid)?;
    let chat = ChatClient::new(&config.chat).context("chat client setup failed")?;

    // The conversation log lives here, in the caller, and is handed into
    // every query; the gate and generator stay free of ambient state.
    let mut history: Vec<ChatTurn> = Vec::new();

    println!("Ask questions about the indexed documents. Type 'exit' to quit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match answer_question(&gate, &chat, question, &history, verbose).await {
            Ok(answer) => {
                print!("{}", formatter.format_answer(&answer));
                history.push(ChatTurn::user(question));
                history.push(ChatTurn::assistant(answer.answer));
            }
            Err(error) => {
                eprint!("{}", formatter.format_message(&format!("Error: {:#}", error)));
            }
        }
    }

    Ok(())
}
