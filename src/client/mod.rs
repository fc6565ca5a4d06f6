//! Terminal chat client: microphone capture, playback, and history

pub mod capture;
pub mod history;
pub mod playback;
pub mod session;

pub use capture::{AudioCapture, CAPTURE_WINDOW, SAMPLE_RATE, samples_to_wav};
pub use history::{ChatHistory, ChatTurn, TurnAudio};
pub use playback::{AudioPlayback, PlaybackHandle};
pub use session::ChatSession;
