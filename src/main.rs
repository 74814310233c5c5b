use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kisan_gateway::audio::{
    self, AudioGraph, CaptureController, PlaybackEngine, PlaybackScheduler,
};
use kisan_gateway::dashboard::UiBridge;
use kisan_gateway::session::wire::ClientMessage;
use kisan_gateway::{Config, Daemon};

/// Kisan - realtime voice assistant gateway for Indian farmers
#[derive(Parser)]
#[command(name = "kisan", version, about)]
struct Cli {
    /// Reply language code (e.g. "hi-IN"); overrides the saved preference
    #[arg(short, long, env = "KISAN_LANGUAGE")]
    language: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone capture through the outbound block pipeline
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output through the playback scheduler
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,kisan_gateway=info",
        1 => "info,kisan_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
        };
    }

    tracing::info!(language = ?cli.language, "starting kisan gateway");

    let config = Config::load(cli.language.as_deref())?;
    tracing::debug!(?config, "loaded configuration");

    let daemon = Daemon::new(config).await?;
    tracing::info!("kisan gateway ready - type start to begin talking");

    daemon.run().await?;
    Ok(())
}

/// Test microphone input by counting captured blocks and metering them
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let graph = AudioGraph::activate()?;
    let (ui, mut ui_events) = UiBridge::new();
    let (block_tx, mut block_rx) = tokio::sync::mpsc::unbounded_channel::<ClientMessage>();

    let mut capture = CaptureController::new();
    capture.start(Some(graph.capture()), Some(block_tx), &ui)?;

    // Drain status events in the background
    tokio::spawn(async move { while ui_events.recv().await.is_some() {} });

    println!("Block size: {} frames", audio::CAPTURE_BLOCK_FRAMES);
    println!("---");

    for second in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut samples: Vec<f32> = Vec::new();
        while let Ok(message) = block_rx.try_recv() {
            if let ClientMessage::RealtimeInput(input) = message {
                if let Ok(block) = audio::decode_blob(&input.realtime_input.media.data) {
                    samples.extend(block);
                }
            }
        }

        let rms = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (rms * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {rms:.4} | Peak: {peak:.4} | [{meter}]", second + 1);
    }

    capture.stop(&ui);

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output by scheduling a sine chunk through the pipeline
#[allow(clippy::future_not_send)]
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let graph = AudioGraph::activate()?;
    let mut playback = PlaybackEngine::new();
    let scheduler = PlaybackScheduler::new(playback.clock(), graph.cursor());
    playback.start(graph.playback(), scheduler.clone())?;

    let sample_rate = audio::PLAYBACK_SAMPLE_RATE;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    // Route the tone through the same encode/decode/schedule path replies use
    let blob = audio::encode_blob(&samples);
    scheduler.handle_chunk(&blob.data)?;

    println!("Playing {num_samples} samples at {sample_rate} Hz...");
    tokio::time::sleep(Duration::from_secs_f32(duration_secs + 0.5)).await;

    playback.stop();
    graph.close();

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}
