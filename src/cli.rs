use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::conversation::Speaker;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported languages
    Languages,

    /// Translate a single piece of text
    Translate {
        /// Source language code
        #[arg(short, long, default_value = "en")]
        from: String,

        /// Target language code
        #[arg(short, long)]
        to: String,

        /// Synthesize speech for the translation
        #[arg(short, long)]
        speak: bool,

        /// Write synthesized audio to this file
        #[arg(long)]
        audio_out: Option<PathBuf>,

        /// Text to translate
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Recognize speech from an audio file, then translate it
    Listen {
        /// Input audio file (16 kHz WAV for whisper.cpp)
        #[arg(short, long)]
        input: PathBuf,

        /// Spoken language code
        #[arg(short, long, default_value = "en")]
        from: String,

        /// Target language code
        #[arg(short, long)]
        to: String,

        /// Synthesize speech for the translation
        #[arg(short, long)]
        speak: bool,
    },

    /// Translate lines from stdin, keeping a session history
    Interactive {
        /// Source language code
        #[arg(short, long, default_value = "en")]
        from: String,

        /// Target language code
        #[arg(short, long)]
        to: String,

        /// Synthesize speech for every translation
        #[arg(short, long)]
        speak: bool,
    },

    /// Two-party conversation; prefix lines with `a:` or `b:`
    Converse {
        /// Name of the first party
        #[arg(long, default_value = "A")]
        a_name: String,

        /// Language of the first party
        #[arg(long)]
        a_lang: String,

        /// Name of the second party
        #[arg(long, default_value = "B")]
        b_name: String,

        /// Language of the second party
        #[arg(long)]
        b_lang: String,

        /// Synthesize speech for every translation
        #[arg(short, long)]
        speak: bool,
    },
}

/// One line typed into `interactive` or `converse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    /// Plain text to translate
    Text(String),
    /// `a: ...` / `b: ...` in conversation mode
    Say(Speaker, String),
    History,
    Recent,
    Favorite(u64),
    Favorites,
    Stats,
    Clear,
    Swap,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Which loop a line was typed into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplMode {
    Interactive,
    /// Accepts `a:` / `b:` speaker prefixes
    Converse,
}

pub fn parse_repl_line(line: &str, mode: ReplMode) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }

    if let Some(command) = line.strip_prefix(':') {
        let mut parts = command.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some("history"), None) => ReplInput::History,
            (Some("recent"), None) => ReplInput::Recent,
            (Some("fav"), Some(id)) => match id.trim_start_matches('#').parse() {
                Ok(id) => ReplInput::Favorite(id),
                Err(_) => ReplInput::Unknown(line.to_string()),
            },
            (Some("favorites"), None) => ReplInput::Favorites,
            (Some("stats"), None) => ReplInput::Stats,
            (Some("clear"), None) => ReplInput::Clear,
            (Some("swap"), None) => ReplInput::Swap,
            (Some("help"), None) => ReplInput::Help,
            (Some("quit") | Some("q"), None) => ReplInput::Quit,
            _ => ReplInput::Unknown(line.to_string()),
        };
    }

    if mode == ReplMode::Interactive {
        return ReplInput::Text(line.to_string());
    }

    let lower = line.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("a:") => ReplInput::Say(Speaker::A, line[2..].trim().to_string()),
        Some("b:") => ReplInput::Say(Speaker::B, line[2..].trim().to_string()),
        _ => ReplInput::Text(line.to_string()),
    }
}

pub const REPL_HELP: &str = "\
Commands:
  :history      show history, oldest first
  :recent       show history, newest first
  :fav <id>     toggle favorite on an exchange
  :favorites    show favorite exchanges
  :stats        show translation statistics
  :clear        clear history
  :swap         swap the two parties (converse only)
  :help         show this help
  :quit         exit";
