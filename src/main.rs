//! Tsuyaku - Text and Speech Translation Sessions
//!
//! Command line front end: one-shot translation, speech input, an interactive
//! session with history and favorites, and a two-party conversation mode.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};

use tsuyaku::cli::{parse_repl_line, Args, Commands, ReplInput, ReplMode, REPL_HELP};
use tsuyaku::config::Config;
use tsuyaku::conversation::{Conversation, Party, Speaker};
use tsuyaku::error::TsuyakuError;
use tsuyaku::language::LanguageCatalog;
use tsuyaku::playback::{sink_from_config, AudioSink, PlaybackQueue};
use tsuyaku::recognize::{CaptureOutcome, RecognizerFactory, SpeechCapture};
use tsuyaku::session::{Exchange, ExchangeId, HistoryOrder, Session, TranslationRequest};
use tsuyaku::speech::SynthesizerFactory;
use tsuyaku::translate::TranslatorFactory;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let _log_guard = setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("tsuyaku.toml").exists() {
                info!("Found tsuyaku.toml in current directory, loading...");
                Config::from_file("tsuyaku.toml")?
            } else {
                Config::default()
            }
        }
    };

    let catalog = LanguageCatalog::default();

    match args.command {
        Commands::Languages => {
            println!("\nSupported Languages:");
            println!("{:<8} {:<30}", "Code", "Language");
            println!("{}", "-".repeat(38));
            for (code, label) in catalog.iter() {
                println!("{:<8} {:<30}", code, label);
            }
        }
        Commands::Translate { from, to, speak, audio_out, text } => {
            let session = build_session(&config, catalog)?;
            let request = TranslationRequest::new(text.join(" "), from, to)
                .with_speech(config.wants_speech(speak) || audio_out.is_some());

            let exchange = submit_with_spinner(&session, request).await?;
            print_exchange(&session, &exchange);

            match (audio_out, &exchange.audio) {
                (Some(path), Some(clip)) => {
                    tokio::fs::write(&path, &clip.bytes[..]).await?;
                    println!("Audio saved to {}", path.display());
                }
                (Some(_), None) => warn!("No audio was synthesized for this translation"),
                (None, _) => play_now(&config, &exchange).await?,
            }
        }
        Commands::Listen { input, from, to, speak } => {
            let session = build_session(&config, catalog)?;
            let capture = SpeechCapture::new(Arc::from(RecognizerFactory::create_default(config.recognizer.clone())));

            let sample = tokio::fs::read(&input).await?;
            let text = match capture.capture_or_prompt(&sample, &from).await {
                CaptureOutcome::Text(text) => text,
                CaptureOutcome::PromptForText(kind) => {
                    println!("Could not recognize speech ({}). Type the text instead:", kind);
                    let mut line = String::new();
                    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
                    line
                }
            };

            println!("Heard: {}", text.trim());
            let request = TranslationRequest::new(text, from, to).with_speech(config.wants_speech(speak));
            let exchange = submit_with_spinner(&session, request).await?;
            print_exchange(&session, &exchange);
            play_now(&config, &exchange).await?;
        }
        Commands::Interactive { from, to, speak } => {
            let session = build_session(&config, catalog)?;
            run_interactive(&config, &session, &from, &to, config.wants_speech(speak)).await?;
        }
        Commands::Converse { a_name, a_lang, b_name, b_lang, speak } => {
            let session = Arc::new(build_session(&config, catalog)?);
            let conversation = Conversation::new(
                session,
                Party::new(a_name, a_lang),
                Party::new(b_name, b_lang),
            )?;
            run_conversation(&config, conversation, config.wants_speech(speak)).await?;
        }
    }

    Ok(())
}

fn build_session(config: &Config, catalog: LanguageCatalog) -> Result<Session> {
    let translator = TranslatorFactory::create_translator(config.translate.clone())?;
    let synthesizer = SynthesizerFactory::create_default(config.speech.clone())?;
    let session = Session::new(catalog, Arc::from(translator), Arc::from(synthesizer));
    info!("Session {} ready ({:?} translator)", session.id(), config.translate.mode);
    Ok(session)
}

/// Submit with a spinner on stderr while the services are busy
async fn submit_with_spinner(session: &Session, request: TranslationRequest) -> tsuyaku::error::Result<Exchange> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Translating...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = session.submit(request).await;
    spinner.finish_and_clear();
    result
}

/// Submit and report failures without ending the interactive loop
async fn submit_and_report(session: &Session, request: TranslationRequest) -> Option<Exchange> {
    match submit_with_spinner(session, request).await {
        Ok(exchange) => {
            print_exchange(session, &exchange);
            Some(exchange)
        }
        Err(TsuyakuError::TranslationFailed { exchange, source }) => {
            println!("Translation {} failed: {}", exchange.id, source);
            None
        }
        Err(e) => {
            println!("{}", e);
            None
        }
    }
}

async fn play_now(config: &Config, exchange: &Exchange) -> Result<()> {
    if let (Some(sink), Some(clip)) = (sink_from_config(&config.playback)?, &exchange.audio) {
        let mut queue = PlaybackQueue::new();
        queue.enqueue(exchange.id, clip.clone());
        queue.drain(sink.as_ref()).await;
    }
    Ok(())
}

async fn run_interactive(config: &Config, session: &Session, from: &str, to: &str, speak: bool) -> Result<()> {
    let sink = sink_from_config(&config.playback)?;
    let mut queue = PlaybackQueue::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Translating {} -> {}. Type text to translate, :help for commands.",
        session.catalog().label_or_code(from),
        session.catalog().label_or_code(to)
    );

    while let Some(line) = lines.next_line().await? {
        match parse_repl_line(&line, ReplMode::Interactive) {
            ReplInput::Text(text) => {
                let request = TranslationRequest::new(text, from, to).with_speech(speak);
                if let Some(exchange) = submit_and_report(session, request).await {
                    enqueue_audio(&mut queue, &exchange);
                }
            }
            ReplInput::Quit => break,
            other => handle_session_command(session, other),
        }
        drain_queue(&mut queue, sink.as_deref()).await;
    }

    print_stats(session);
    Ok(())
}

async fn run_conversation(config: &Config, mut conversation: Conversation, speak: bool) -> Result<()> {
    let sink = sink_from_config(&config.playback)?;
    let mut queue = PlaybackQueue::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut speaker = Speaker::A;

    print_parties(&conversation);

    while let Some(line) = lines.next_line().await? {
        let text = match parse_repl_line(&line, ReplMode::Converse) {
            ReplInput::Say(who, text) => {
                speaker = who;
                text
            }
            ReplInput::Text(text) => text,
            ReplInput::Swap => {
                conversation.swap();
                print_parties(&conversation);
                continue;
            }
            ReplInput::Quit => break,
            other => {
                handle_session_command(conversation.session(), other);
                continue;
            }
        };

        let name = conversation.party(speaker).name.clone();
        match conversation.say(speaker, &text, speak).await {
            Ok(exchange) => {
                println!("{}: {}", name, exchange.translated_text.as_deref().unwrap_or_default());
                enqueue_audio(&mut queue, &exchange);
            }
            Err(e) => println!("{}", e),
        }
        drain_queue(&mut queue, sink.as_deref()).await;
    }

    println!("{} turn(s) in this conversation", conversation.transcript().len());
    print_stats(conversation.session());
    Ok(())
}

fn handle_session_command(session: &Session, input: ReplInput) {
    match input {
        ReplInput::History => print_history(session, HistoryOrder::Chronological),
        ReplInput::Recent => print_history(session, HistoryOrder::MostRecentFirst),
        ReplInput::Favorite(id) => match session.toggle_favorite(ExchangeId(id)) {
            Ok(true) => println!("Added {} to favorites", ExchangeId(id)),
            Ok(false) => println!("Removed {} from favorites", ExchangeId(id)),
            Err(e) => println!("{}", e),
        },
        ReplInput::Favorites => {
            for exchange in session.favorites() {
                print_exchange(session, &exchange);
            }
        }
        ReplInput::Stats => print_stats(session),
        ReplInput::Clear => {
            session.clear();
            println!("History cleared");
        }
        ReplInput::Help => println!("{}", REPL_HELP),
        ReplInput::Swap => println!(":swap is only available in converse mode"),
        ReplInput::Unknown(line) => println!("Unknown command: {} (try :help)", line),
        ReplInput::Text(_) | ReplInput::Say(..) | ReplInput::Quit | ReplInput::Empty => {}
    }
}

fn enqueue_audio(queue: &mut PlaybackQueue, exchange: &Exchange) {
    if let Some(clip) = &exchange.audio {
        queue.enqueue(exchange.id, clip.clone());
    }
}

async fn drain_queue(queue: &mut PlaybackQueue, sink: Option<&dyn AudioSink>) {
    match sink {
        Some(sink) => {
            queue.drain(sink).await;
        }
        None if !queue.is_empty() => {
            info!("No player configured, discarding {} audio clip(s)", queue.len());
            *queue = PlaybackQueue::new();
        }
        None => {}
    }
}

fn print_parties(conversation: &Conversation) {
    let a = conversation.party(Speaker::A);
    let b = conversation.party(Speaker::B);
    println!("a: {} ({}) <-> b: {} ({})", a.name, a.language, b.name, b.language);
}

fn print_exchange(session: &Session, exchange: &Exchange) {
    let catalog = session.catalog();
    let star = if exchange.favorite { "*" } else { " " };
    println!(
        "{}{:<6} {} {} -> {}",
        star,
        exchange.id.to_string(),
        exchange.created_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
        catalog.label_or_code(&exchange.source_lang),
        catalog.label_or_code(&exchange.target_lang),
    );
    println!("        Original:    {}", exchange.source_text);
    match &exchange.translated_text {
        Some(text) => println!("        Translation: {}", text),
        None => println!("        Translation: (failed)"),
    }
    if let Some(clip) = &exchange.audio {
        println!("        Audio:       {} bytes {}", clip.len(), clip.format.extension());
    }
}

fn print_history(session: &Session, order: HistoryOrder) {
    let history = session.list_history(order);
    if history.len() == 0 {
        println!("Start translating to see your history here.");
        return;
    }
    for exchange in history {
        print_exchange(session, &exchange);
    }
}

fn print_stats(session: &Session) {
    let stats = session.stats();
    println!("Total translations: {}  Favorites: {}", stats.total, stats.favorites);
}

/// Console gets warnings, or everything with `--verbose`. The daily log file
/// always gets this crate's debug output. Dropping the guard flushes the file.
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".tsuyaku").join("log");
    std::fs::create_dir_all(&log_dir)?;
    let (file_writer, guard) = non_blocking(rolling::daily(&log_dir, "tsuyaku.log"));

    let console_level = if verbose { Level::DEBUG } else { Level::WARN };
    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .from_env_lossy();

    // stderr, so log lines never mix with translations on stdout
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_line_number(true)
        .with_filter(EnvFilter::new("tsuyaku=debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!(dir = %log_dir.display(), "Logging to file");
    Ok(guard)
}
