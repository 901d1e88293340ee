use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use voxnote::capture::SoxBackend;
use voxnote::http::{create_router, AppState};
use voxnote::session::{SessionController, SessionError, SessionStatus};
use voxnote::storage::{self, RecordingStore, TranscriptRecord};
use voxnote::transcription::TranscriptionClient;
use voxnote::Config;

#[derive(Parser)]
#[command(name = "voxnote", about = "Microphone voice notes with cloud transcription")]
struct Cli {
    /// Configuration file (TOML, extension omitted per the config crate).
    #[arg(long, default_value = "config/voxnote")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control API (the default).
    Serve,
    /// Record one note from the terminal; stops on Ctrl-C or after --seconds.
    Record {
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// List recordings with their estimated durations.
    List,
    /// Transcribe an existing recording and write its transcript sidecar.
    Transcribe { file: String },
    /// Delete recordings older than the given age.
    Prune {
        #[arg(long)]
        max_age_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    let store = RecordingStore::new(
        config.recording.resolved_directory(),
        config.recording.min_file_bytes,
    );
    let backend = Arc::new(SoxBackend::new(config.capture.tool.clone()));
    let controller = Arc::new(SessionController::new(
        backend,
        store.clone(),
        Duration::from_secs(config.recording.max_duration_secs),
    ));
    let transcriber = if config.transcription.is_configured() {
        Some(Arc::new(TranscriptionClient::new(
            config.transcription.clone(),
        )?))
    } else {
        None
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, controller, store, transcriber).await,
        Command::Record { seconds } => {
            record_once(&config, &controller, seconds.unwrap_or(config.recording.max_duration_secs))
                .await
        }
        Command::List => list(&store),
        Command::Transcribe { file } => transcribe(&store, transcriber, &file).await,
        Command::Prune { max_age_secs } => {
            let deleted = store.prune_older_than(Duration::from_secs(max_age_secs))?;
            info!("deleted {} recordings", deleted);
            Ok(())
        }
    }
}

async fn serve(
    config: &Config,
    controller: Arc<SessionController>,
    store: RecordingStore,
    transcriber: Option<Arc<TranscriptionClient>>,
) -> Result<()> {
    let app = create_router(AppState::new(Arc::clone(&controller), store, transcriber));

    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("{} listening on {}", config.service.name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("HTTP server failed")?;

    // Teardown flows through the controller so a capture left running is
    // killed and its ticker cleared.
    controller.shutdown().await;
    Ok(())
}

async fn record_once(
    config: &Config,
    controller: &SessionController,
    seconds: u64,
) -> Result<()> {
    let seconds = seconds.min(config.recording.max_duration_secs);

    let path = controller.start().await?;
    info!(
        "recording to {} (Ctrl-C to stop, auto-stop after {}s)",
        path.display(),
        seconds
    );

    tokio::select! {
        _ = signal::ctrl_c() => {}
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
    }

    let path = match controller.stop().await {
        Ok(path) => path,
        // The tool's own duration cap can beat the timer to the stop; the
        // session has then already completed (or failed) on its own.
        Err(SessionError::NotRecording) => {
            let snapshot = controller.snapshot();
            match (snapshot.status, snapshot.file_path) {
                (SessionStatus::Stopped, Some(path)) => path,
                _ => bail!(
                    "recording ended early: {}",
                    snapshot
                        .last_error
                        .unwrap_or_else(|| "unknown error".to_string())
                ),
            }
        }
        Err(e) => return Err(e.into()),
    };
    let estimate = storage::estimate_duration(&path)?;
    info!(
        "saved {} ({}s{})",
        path.display(),
        estimate.seconds,
        if estimate.approximate { ", approximate" } else { "" }
    );
    Ok(())
}

fn list(store: &RecordingStore) -> Result<()> {
    let recordings = store.list_recordings()?;
    if recordings.is_empty() {
        println!("no recordings in {}", store.directory().display());
        return Ok(());
    }

    for path in recordings {
        match storage::estimate_duration(&path) {
            Ok(estimate) => println!(
                "{}  {}s{}",
                path.display(),
                estimate.seconds,
                if estimate.approximate { " (approximate)" } else { "" }
            ),
            Err(_) => println!("{}", path.display()),
        }
    }
    Ok(())
}

async fn transcribe(
    store: &RecordingStore,
    transcriber: Option<Arc<TranscriptionClient>>,
    file: &str,
) -> Result<()> {
    let Some(transcriber) = transcriber else {
        bail!("transcription.api_key is not configured (set VOXNOTE_TRANSCRIPTION__API_KEY)");
    };

    // A bare name is looked up in the recordings directory.
    let path = if file.contains(std::path::MAIN_SEPARATOR) {
        PathBuf::from(file)
    } else {
        store.directory().join(file)
    };
    storage::validate(&path, store.min_file_bytes())?;

    let audio = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("recording.wav")
        .to_string();

    let text = transcriber.transcribe(audio, &file_name).await?;
    let sidecar = TranscriptRecord::new(text.clone(), path).write_beside()?;

    println!("{text}");
    info!("transcript written to {}", sidecar.display());
    Ok(())
}
