//! Talkback - request/response voice chatbot gateway
//!
//! This library provides the core functionality for the talkback gateway:
//! - Bounded microphone capture, persisted chat history, and replayable
//!   playback (client)
//! - Asynchronous transcription driving (upload, job creation, bounded
//!   polling)
//! - Deterministic rule-based reply generation
//! - Speech synthesis and audio artifact publishing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Chat client                       │
//! │   Capture  │  History  │  Playback                  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ POST /api/process-audio
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Talkback gateway                     │
//! │   STT poller │ Reply rules │ TTS │ Publisher        │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               External services                      │
//! │   Transcription API │ TTS API │ Object storage      │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod reply;
pub mod stt;
pub mod tts;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{AudioBlob, Pipeline, SttProvider, TtsProvider, TurnReply};
pub use publish::ArtifactPublisher;
pub use reply::{ReplyRule, ReplyRules};
pub use stt::{
    HttpTranscriptionService, JobStatus, PollPolicy, TranscriptionJob, TranscriptionPoller,
    TranscriptionService,
};
pub use tts::SpeechSynthesizer;
