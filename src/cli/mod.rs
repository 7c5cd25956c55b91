//! Command-line interface for veritrack.
//!
//! Provides commands for managing the verifier key, inspecting transcripts,
//! fact-checking a video once, and following a simulated playback.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::adapters::youtube::parse_video_id;
use crate::adapters::{GeminiVerifier, HttpCaptionSource};
use crate::config::{self, ResolvedConfig, API_KEY_SETTING};
use crate::core::{ClaimNormalizer, PlaybackClock, SessionController, TranscriptExtractor};
use crate::presentation::{PresentationSurface, TerminalSurface};
use crate::settings::{mask_secret, save_api_key, FileSettingsStore, SettingsStore};

pub mod player;

use player::{SimulatedPlayer, WatchCommand};

/// veritrack - Truth-score timeline for videos
#[derive(Parser, Debug)]
#[command(name = "veritrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the verifier API key
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Print the decoded transcript of a video
    Transcript {
        /// Watch URL or video id
        video: String,
    },

    /// Fact-check a video once and print the claim timeline
    Analyze {
        /// Watch URL or video id
        video: String,

        /// Hide per-claim reasoning
        #[arg(long)]
        brief: bool,
    },

    /// Follow a simulated playback; reads commands from stdin
    Watch {
        /// Video to open immediately (URL or id)
        video: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Store the API key
    Set {
        /// The key (surrounding whitespace is trimmed)
        #[arg(env = "VERITRACK_API_KEY")]
        value: String,
    },

    /// Show the stored key, masked
    Show,

    /// Remove the stored key
    Clear,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Key { command } => execute_key(command).await,
            Commands::Transcript { video } => show_transcript(&video).await,
            Commands::Analyze { video, brief } => analyze(&video, brief).await,
            Commands::Watch { video } => watch(video).await,
            Commands::Config => show_config(),
        }
    }
}

fn resolve_video(input: &str) -> Result<String> {
    parse_video_id(input).with_context(|| format!("Not a video URL or id: {}", input))
}

fn build_extractor(config: &ResolvedConfig) -> TranscriptExtractor {
    TranscriptExtractor::new(
        Arc::new(HttpCaptionSource::new(&config.captions)),
        config.captions.preferred_languages.clone(),
    )
}

fn build_normalizer(config: &ResolvedConfig, store: Arc<dyn SettingsStore>) -> Result<ClaimNormalizer> {
    let verifier = GeminiVerifier::new(config.verifier.clone(), store)?;
    Ok(ClaimNormalizer::new(Arc::new(verifier))
        .with_max_transcript_chars(config.verifier.max_transcript_chars))
}

async fn execute_key(command: KeyCommands) -> Result<()> {
    let store = FileSettingsStore::open_default()?;

    match command {
        KeyCommands::Set { value } => {
            save_api_key(&store, &value).await?;
            println!("Settings saved to {}", store.path().display());
        }
        KeyCommands::Show => match store.get(API_KEY_SETTING).await? {
            Some(key) => println!("{}", mask_secret(&key)),
            None => println!("(not set)"),
        },
        KeyCommands::Clear => {
            store.remove(API_KEY_SETTING).await?;
            println!("API key removed");
        }
    }

    Ok(())
}

/// Print a video's transcript
async fn show_transcript(video: &str) -> Result<()> {
    let config = config::config()?;
    let video_id = resolve_video(video)?;

    let transcript = build_extractor(config).fetch(&video_id).await?;
    for segment in &transcript.segments {
        println!("[{:.1}s] {}", segment.start, segment.text);
    }
    eprintln!(
        "\n[{} segments, {:.0}s]",
        transcript.len(),
        transcript.duration_seconds()
    );

    Ok(())
}

/// Extract, verify and print the scored claim timeline
async fn analyze(video: &str, brief: bool) -> Result<()> {
    let config = config::config()?;
    let video_id = resolve_video(video)?;
    let store: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::open_default()?);

    let transcript = build_extractor(config).fetch(&video_id).await?;
    eprintln!("Analysing {} segments...", transcript.len());

    let claim_set = build_normalizer(config, store)?
        .normalize(&transcript)
        .await?;

    let mut surface = TerminalSurface::new(io::stdout());
    surface.set_expanded(!brief);
    surface.show();
    surface.set_overall_score(Some(claim_set.overall_score));
    surface.render_claims(&claim_set.claims);

    Ok(())
}

/// Run the session controller against a simulated player
async fn watch(video: Option<String>) -> Result<()> {
    let config = config::config()?;
    let store: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore::open_default()?);

    let player = Arc::new(SimulatedPlayer::new());
    if let Some(video) = video {
        player.open(resolve_video(&video)?);
    }

    let controller = SessionController::new(
        player.clone(),
        player.clone(),
        Arc::new(build_extractor(config)),
        Arc::new(build_normalizer(config, store)?),
        Box::new(TerminalSurface::new(io::stdout())),
        config.sync.lookahead_seconds,
    );

    let (clock_tx, clock_rx) = mpsc::channel(64);
    let ticker = player
        .clone()
        .spawn_ticker(config.sync.clock_tick_interval(), clock_tx);
    let handle = controller.spawn(config.sync.identity_poll_interval(), clock_rx);

    eprintln!("Commands: open <video>, close, seek <seconds>, claim <n>, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        match WatchCommand::parse(&line) {
            Ok(Some(WatchCommand::Open(video_id))) => player.open(video_id),
            Ok(Some(WatchCommand::Close)) => player.close(),
            Ok(Some(WatchCommand::Seek(position))) => player.seek_to(position),
            Ok(Some(WatchCommand::Claim(index))) => handle.seek_to_claim(index).await?,
            Ok(Some(WatchCommand::Quit)) => break,
            Ok(None) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    ticker.abort();
    handle.stop().await?;
    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::reload_config()?;

    println!("home: {}", config.home.display());
    println!("settings: {}", config.settings_path().display());
    match &config.config_file {
        Some(path) => println!("config file: {}", path.display()),
        None => println!("config file: (none)"),
    }
    println!("verifier.model: {}", config.verifier.model);
    println!("verifier.api_base: {}", config.verifier.api_base);
    println!("verifier.timeout_seconds: {}", config.verifier.timeout_seconds);
    match config.verifier.max_transcript_chars {
        Some(limit) => println!("verifier.max_transcript_chars: {}", limit),
        None => println!("verifier.max_transcript_chars: (unlimited)"),
    }
    println!("sync.lookahead_seconds: {}", config.sync.lookahead_seconds);
    println!("sync.identity_poll_ms: {}", config.sync.identity_poll_ms);
    println!("sync.clock_tick_ms: {}", config.sync.clock_tick_ms);
    println!(
        "captions.preferred_languages: {}",
        if config.captions.preferred_languages.is_empty() {
            "(first track)".to_string()
        } else {
            config.captions.preferred_languages.join(", ")
        }
    );
    println!("captions.watch_url_base: {}", config.captions.watch_url_base);

    Ok(())
}
