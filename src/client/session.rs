//! Interactive chat session
//!
//! A terminal loop over the gateway: record a turn, list history, play
//! or delete entries. Command failures print one line and the loop
//! keeps going; only losing stdin ends the session.

use std::io::Write;
use std::path::PathBuf;

use base64::Engine;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::capture::{AudioCapture, CAPTURE_WINDOW};
use super::history::{ChatHistory, ChatTurn, TurnAudio};
use super::playback::AudioPlayback;
use crate::pipeline::{AudioBlob, TurnReply};
use crate::{Error, Result};

/// Shown when the microphone cannot be acquired
pub const MIC_DENIED_MESSAGE: &str =
    "Microphone access denied. Please allow access to continue.";

/// Shown when a turn fails anywhere past capture
pub const PROCESS_FAILED_MESSAGE: &str = "Failed to process audio. Please try again.";

/// One parsed line of user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Record,
    List,
    /// Play or stop entry N (1-based, as typed)
    Toggle(usize),
    /// Delete entry N (1-based, as typed)
    Delete(usize),
    Help,
    Quit,
    Empty,
    Unknown,
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    let mut parts = trimmed.split_whitespace();
    let head = parts.next().unwrap_or_default().to_ascii_lowercase();
    let number = parts.next().and_then(|arg| arg.parse().ok());

    match (head.as_str(), number) {
        ("r" | "record", _) => Command::Record,
        ("l" | "list", _) => Command::List,
        ("p" | "play", Some(n)) => Command::Toggle(n),
        ("d" | "delete", Some(n)) => Command::Delete(n),
        ("q" | "quit" | "exit", _) => Command::Quit,
        ("h" | "help" | "?", _) => Command::Help,
        _ => Command::Unknown,
    }
}

/// Terminal chat client talking to a running gateway
pub struct ChatSession {
    server_url: String,
    client: reqwest::Client,
    history: ChatHistory,
    playback: Option<AudioPlayback>,
}

impl ChatSession {
    /// Create a session against `server_url`, loading persisted history
    ///
    /// A missing output device disables playback but not the rest of
    /// the session.
    ///
    /// # Errors
    ///
    /// Returns error if the history file exists but cannot be loaded
    pub fn new(server_url: impl Into<String>, history_path: PathBuf) -> Result<Self> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        let history = ChatHistory::load(history_path)?;

        let playback = match AudioPlayback::new() {
            Ok(playback) => Some(playback),
            Err(e) => {
                tracing::warn!(error = %e, "audio playback unavailable");
                None
            }
        };

        Ok(Self {
            server_url,
            client: reqwest::Client::new(),
            history,
            playback,
        })
    }

    /// Run the interactive loop until quit or end of input
    ///
    /// # Errors
    ///
    /// Returns error if stdin or stdout is lost
    #[allow(clippy::future_not_send)]
    pub async fn run(&self) -> Result<()> {
        println!("Connected to {}.", self.server_url);
        println!("Type 'r' to record a message, 'h' for all commands.");

        let mut reader = BufReader::new(tokio::io::stdin());

        loop {
            if let Err(e) = self.history.reap_finished() {
                tracing::debug!(error = %e, "failed to clear finished playback");
            }

            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                // End of input
                break;
            }

            match parse_command(&line) {
                Command::Record => self.record_turn().await,
                Command::List => self.print_history(),
                Command::Toggle(number) => self.toggle_turn(number).await,
                Command::Delete(number) => self.delete_turn(number),
                Command::Help => print_help(),
                Command::Quit => break,
                Command::Empty => {}
                Command::Unknown => println!("Unrecognized command. Type 'h' for help."),
            }
        }

        Ok(())
    }

    /// Record one turn and send it through the gateway
    #[allow(clippy::future_not_send)]
    async fn record_turn(&self) {
        let mut capture = match AudioCapture::new() {
            Ok(capture) => capture,
            Err(e) => {
                tracing::debug!(error = %e, "microphone unavailable");
                println!("{MIC_DENIED_MESSAGE}");
                return;
            }
        };

        println!("Recording for {} seconds...", CAPTURE_WINDOW.as_secs());
        let blob = match capture.record().await {
            Ok(blob) => blob,
            Err(e) => {
                tracing::debug!(error = %e, "recording failed");
                println!("{PROCESS_FAILED_MESSAGE}");
                return;
            }
        };

        println!("Processing...");
        match self.send_turn(&blob).await {
            Ok(reply) => {
                println!("Bot: {}", reply.text);
                if let Err(e) = self
                    .history
                    .append(ChatTurn::new(reply.text, reply.audio_url))
                {
                    tracing::warn!(error = %e, "failed to persist history");
                    println!("Warning: this turn could not be saved.");
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "turn request failed");
                println!("{PROCESS_FAILED_MESSAGE}");
            }
        }
    }

    async fn send_turn(&self, blob: &AudioBlob) -> Result<TurnReply> {
        let response = self
            .client
            .post(format!("{}/api/process-audio", self.server_url))
            .header(reqwest::header::CONTENT_TYPE, blob.mime_type.clone())
            .body(blob.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Pipeline(format!("server returned {status}")));
        }

        Ok(response.json::<TurnReply>().await?)
    }

    /// Play entry `number`, or stop it if it is the one playing
    #[allow(clippy::future_not_send)]
    async fn toggle_turn(&self, number: usize) {
        let Some(index) = number.checked_sub(1) else {
            println!("No such entry.");
            return;
        };
        let Some(turn) = self.history.turns().get(index).cloned() else {
            println!("No such entry.");
            return;
        };

        // Audio is only needed when starting; stopping skips the fetch
        let audio = if turn.is_playing {
            None
        } else {
            match self.fetch_audio(&turn.audio_url).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::debug!(error = %e, "audio fetch failed");
                    println!("{PROCESS_FAILED_MESSAGE}");
                    return;
                }
            }
        };

        let result = self.history.toggle(index, || {
            let playback = self
                .playback
                .as_ref()
                .ok_or_else(|| Error::Audio("audio playback unavailable".to_string()))?;
            let data =
                audio.ok_or_else(|| Error::Audio("no audio data to play".to_string()))?;
            let handle = playback.play_mp3(&data)?;
            Ok(Box::new(handle) as Box<dyn TurnAudio>)
        });

        if let Err(e) = result {
            tracing::debug!(error = %e, "playback failed");
            println!("Could not play that entry.");
        }
    }

    fn delete_turn(&self, number: usize) {
        let Some(index) = number.checked_sub(1) else {
            println!("No such entry.");
            return;
        };
        if index >= self.history.len() {
            println!("No such entry.");
            return;
        }

        match self.history.remove(index) {
            Ok(()) => println!("Deleted entry {number}."),
            Err(e) => {
                tracing::debug!(error = %e, "delete failed");
                println!("Could not delete that entry.");
            }
        }
    }

    fn print_history(&self) {
        let turns = self.history.turns();
        if turns.is_empty() {
            println!("No chat history yet. Type 'r' to record a message.");
            return;
        }

        for (number, turn) in turns.iter().enumerate() {
            let marker = if turn.is_playing { " [playing]" } else { "" };
            println!("{:3}. {}{marker}", number + 1, turn.text);
        }
    }

    /// Fetch reply audio from a data URI, a gateway path, or a full URL
    async fn fetch_audio(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(encoded) = url.strip_prefix("data:audio/mpeg;base64,") {
            return base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| Error::Audio(format!("invalid audio data URI: {e}")));
        }

        let target = if url.starts_with('/') {
            format!("{}{url}", self.server_url)
        } else {
            url.to_string()
        };

        let response = self.client.get(&target).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Audio(format!("audio fetch error {status}")));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn print_help() {
    println!("Commands:");
    println!(
        "  r, record      record a {}-second message",
        CAPTURE_WINDOW.as_secs()
    );
    println!("  l, list        show chat history");
    println!("  p, play N      play entry N (again to stop)");
    println!("  d, delete N    delete entry N");
    println!("  h, help        show this help");
    println!("  q, quit        exit");
}
