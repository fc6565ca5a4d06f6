use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkback::api::ApiServerBuilder;
use talkback::client::{AudioCapture, AudioPlayback, ChatSession};
use talkback::{
    Config, HttpTranscriptionService, Pipeline, PollPolicy, ReplyRules, SpeechSynthesizer,
    TranscriptionPoller, publish,
};

/// Talkback - request/response voice chatbot gateway
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "TALKBACK_PORT", default_value = "8780")]
    port: u16,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway server (default)
    Serve,
    /// Interactive chat client against a running gateway
    Chat {
        /// Gateway base URL
        #[arg(
            long,
            env = "TALKBACK_SERVER_URL",
            default_value = "http://localhost:8780"
        )]
        server: String,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
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
    match cli.command {
        None | Some(Command::Serve) => serve(cli.port).await,
        Some(Command::Chat { server }) => chat(&server).await,
        Some(Command::TestMic { duration }) => test_mic(duration).await,
        Some(Command::TestTts { text }) => test_tts(&text).await,
    }
}

/// Run the gateway server
async fn serve(port: u16) -> anyhow::Result<()> {
    let config = Config::load();

    tracing::info!(
        port,
        storage = %config.storage.strategy,
        "starting talkback gateway"
    );

    let service = HttpTranscriptionService::new(
        &config.transcription.base_url,
        config.transcription.api_key.clone(),
    )?;
    let poller = TranscriptionPoller::with_policy(
        Arc::new(service),
        PollPolicy {
            interval: config.transcription.poll_interval,
            max_attempts: config.transcription.poll_max_attempts,
        },
    );

    let synthesizer =
        SpeechSynthesizer::new(&config.synthesis.base_url, &config.synthesis.language)?;

    let publisher = publish::for_strategy(&config.storage)?;
    tracing::info!(publisher = publisher.name(), "artifact publisher ready");

    let pipeline = Pipeline::new(
        Arc::new(poller),
        ReplyRules::default(),
        Arc::new(synthesizer),
        publisher,
    );

    ApiServerBuilder::new(Arc::new(pipeline), port)
        .artifact_dir(config.storage.static_dir.clone())
        .build()
        .run()
        .await?;

    Ok(())
}

/// Run the interactive chat client
#[allow(clippy::future_not_send)]
async fn chat(server: &str) -> anyhow::Result<()> {
    let config = Config::load();
    let session = ChatSession::new(server, config.history_path())?;
    session.run().await?;
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.peek_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        // Clear buffer each second
        capture.clear_buffer();
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

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

/// Test TTS output
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load();
    let synthesizer =
        SpeechSynthesizer::new(&config.synthesis.base_url, &config.synthesis.language)?;

    println!("Synthesizing speech...");
    let mp3_data = synthesizer.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3_data.len());

    // Check MP3 header
    if mp3_data.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            mp3_data[0], mp3_data[1], mp3_data[2], mp3_data[3]
        );
    }

    println!("Playing audio...");
    let playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data)?.wait();

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
