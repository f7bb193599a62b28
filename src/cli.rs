//! Command line: `serve` runs the proxy, `ask` is a terminal chat client.

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use chat_session::{ChatController, ChatView, Citation, HttpQaTransport, Outcome};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tokio::{signal, task::JoinHandle};
use tracing::info;
use voice_input::{ClipMicrophone, HttpTranscriber, VoiceRecorder};

type Chat = ChatController<HttpQaTransport>;

#[derive(Parser, Debug)]
#[command(name = "rag-chat")]
#[command(version)]
#[command(about = "RAG chat proxy and terminal client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the proxy and chat page (default)
    Serve,
    /// Ask one question and print the answer
    Ask(AskArgs),
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Use the streaming endpoint
    #[arg(long)]
    pub stream: bool,

    /// Base URL of the proxy
    #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:3000")]
    pub proxy: String,

    /// Pre-recorded clip; its transcript becomes the question
    #[arg(long, value_name = "CLIP")]
    pub voice: Option<PathBuf>,

    /// Question text
    pub question: Vec<String>,
}

pub async fn serve() -> Result<ExitCode> {
    let config = api::core::app_state::ProxyConfig::from_env().context("invalid configuration")?;
    api::start(config).await.context("proxy failed")?;
    Ok(ExitCode::SUCCESS)
}

pub async fn ask(args: AskArgs) -> Result<ExitCode> {
    let chat = Arc::new(ChatController::new(
        HttpQaTransport::new(&args.proxy).context("failed to build HTTP client")?,
    ));
    if !args.question.is_empty() {
        chat.set_question(args.question.join(" "));
    }
    if let Some(clip) = &args.voice {
        transcribe(&chat, &args.proxy, clip.clone()).await?;
    }

    let abort_on_ctrl_c = watch_ctrl_c(Arc::clone(&chat));
    let outcome = if args.stream {
        stream_live(&chat).await
    } else {
        chat.ask().await
    };
    abort_on_ctrl_c.abort();

    if outcome == Outcome::EmptyQuestion {
        bail!("nothing to ask: pass a question or --voice");
    }
    render(&chat.view(), args.stream);

    Ok(match outcome {
        Outcome::Failed => ExitCode::FAILURE,
        Outcome::Aborted => {
            println!("{}", "aborted".yellow());
            ExitCode::from(130)
        }
        _ => ExitCode::SUCCESS,
    })
}

/// Runs the clip through the voice widget; the transcript callback fills the question.
async fn transcribe(chat: &Arc<Chat>, proxy: &str, clip: PathBuf) -> Result<()> {
    let target = Arc::clone(chat);
    let recorder = VoiceRecorder::new(
        ClipMicrophone::new(clip),
        HttpTranscriber::new(proxy).context("failed to build HTTP client")?,
        move |text: String| {
            info!(chars = text.chars().count(), "transcript received");
            target.set_question(text);
        },
        |msg: &str| eprintln!("{} {msg}", "voice:".red().bold()),
    );

    if !recorder.start().await {
        bail!("could not open the audio clip");
    }
    recorder.stop().await;

    let question = chat.session().question;
    if question.trim().is_empty() {
        bail!("no transcript for the clip");
    }
    println!("{} {}", "question:".bold(), question);
    Ok(())
}

fn watch_ctrl_c(chat: Arc<Chat>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            chat.abort();
        }
    })
}

/// Streams the answer, echoing new text as it arrives.
async fn stream_live(chat: &Chat) -> Outcome {
    let run = chat.ask_stream();
    tokio::pin!(run);
    let mut tick = tokio::time::interval(Duration::from_millis(50));
    let mut echoed = 0;
    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            _ = tick.tick() => echoed = echo_from(chat, echoed),
        }
    };
    if echo_from(chat, echoed) > 0 {
        println!();
    }
    outcome
}

fn echo_from(chat: &Chat, from: usize) -> usize {
    use std::io::Write;

    let text = chat.session().stream_text;
    if text.len() > from {
        print!("{}", &text[from..]);
        let _ = std::io::stdout().flush();
    }
    text.len()
}

/// Prints the view. The streamed markdown was already echoed live.
fn render(view: &ChatView, streamed: bool) {
    if let Some(panel) = &view.stream_panel {
        let status = if panel.finished {
            "stream finished"
        } else {
            "stream incomplete"
        };
        let id = panel
            .request_id
            .as_deref()
            .map(|id| format!(" request_id={id}"))
            .unwrap_or_default();
        println!("{}", format!("{status}{id}").blue().dimmed());
        if !streamed {
            println!("{}", panel.markdown);
        }
        citations(&view.stream_citations);
    }

    if let Some(panel) = &view.answer_panel {
        println!(
            "{}",
            format!(
                "request_id={} · latency={}ms",
                panel.request_id, panel.latency_ms
            )
            .dimmed()
        );
        println!("{}", panel.markdown);
        citations(&view.answer_citations);
    }

    if let Some(err) = &view.error {
        eprintln!("{} {err}", "error:".red().bold());
    }
}

fn citations(items: &[Citation]) {
    if items.is_empty() {
        return;
    }
    println!("{}", "sources:".bold());
    for c in items {
        let tip = &c.tooltip;
        let similarity = tip
            .similarity
            .as_deref()
            .map(|s| format!("  similarity {s}"))
            .unwrap_or_default();
        println!(
            "  {} 《{}》 p.{}{}",
            format!("[{}]", c.label).cyan().bold(),
            tip.title,
            tip.page,
            similarity.dimmed()
        );
        if let Some(excerpt) = &tip.excerpt {
            println!("      {}", format!("{excerpt}…").italic());
        }
    }
}
