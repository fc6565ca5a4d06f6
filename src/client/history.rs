//! Replayable chat history persisted as JSON
//!
//! Every mutation runs under one lock and rewrites the whole file, so
//! concurrent toggles cannot resurrect a stale snapshot. Playback is a
//! single owned slot: at most one turn is ever marked playing.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One chat exchange as persisted on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    /// Reply text shown in the history list
    pub text: String,
    /// Where the reply audio can be fetched from
    pub audio_url: String,
    /// Whether this turn currently owns the playback slot
    pub is_playing: bool,
}

impl ChatTurn {
    /// Create a turn that is not playing
    #[must_use]
    pub fn new(text: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio_url: audio_url.into(),
            is_playing: false,
        }
    }
}

/// Live audio owned by the history's playing slot
///
/// Implemented by the cpal playback handle; tests substitute a fake so
/// the state machine runs without audio hardware.
pub trait TurnAudio: Send {
    /// Stop the audio
    fn stop(&mut self);

    /// Whether the audio ran to completion on its own
    fn is_finished(&self) -> bool;
}

/// The turn currently holding live audio
struct PlayingSlot {
    index: usize,
    handle: Box<dyn TurnAudio>,
}

impl std::fmt::Debug for PlayingSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayingSlot")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct HistoryInner {
    turns: Vec<ChatTurn>,
    playing: Option<PlayingSlot>,
}

/// Ordered log of chat turns, rewritten to disk on every mutation
#[derive(Debug)]
pub struct ChatHistory {
    inner: Mutex<HistoryInner>,
    path: PathBuf,
}

impl ChatHistory {
    /// Load history from disk, starting empty when the file is absent
    ///
    /// Persisted playing flags are never trusted across sessions: every
    /// turn loads as not playing.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: PathBuf) -> Result<Self> {
        let turns = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| Error::History(format!("cannot read chat history: {e}")))?;
            let mut turns: Vec<ChatTurn> = serde_json::from_str(&json)
                .map_err(|e| Error::History(format!("chat history is corrupt: {e}")))?;
            for turn in &mut turns {
                turn.is_playing = false;
            }
            turns
        } else {
            Vec::new()
        };

        tracing::debug!(path = %path.display(), turns = turns.len(), "chat history loaded");

        Ok(Self {
            inner: Mutex::new(HistoryInner {
                turns,
                playing: None,
            }),
            path,
        })
    }

    /// Snapshot of all turns in conversation order
    #[must_use]
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.lock().turns.clone()
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().turns.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().turns.is_empty()
    }

    /// Append a turn and persist
    ///
    /// # Errors
    ///
    /// Returns error if the history cannot be written to disk
    pub fn append(&self, turn: ChatTurn) -> Result<()> {
        let mut inner = self.lock();
        inner.turns.push(turn);
        persist(&self.path, &inner.turns)
    }

    /// Toggle playback of the turn at `index`
    ///
    /// Whatever turn currently owns the playing slot is stopped first.
    /// Toggling the turn that was playing stops it; toggling any other
    /// turn invokes `start` for a fresh handle. The history persists in
    /// either case, even when `start` fails.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is out of range, `start` fails, or the
    /// history cannot be written to disk
    pub fn toggle(
        &self,
        index: usize,
        start: impl FnOnce() -> Result<Box<dyn TurnAudio>>,
    ) -> Result<()> {
        let mut inner = self.lock();
        if index >= inner.turns.len() {
            return Err(Error::History(format!("no chat entry at index {index}")));
        }

        let was_playing = match inner.playing.take() {
            Some(mut slot) => {
                slot.handle.stop();
                if let Some(turn) = inner.turns.get_mut(slot.index) {
                    turn.is_playing = false;
                }
                slot.index == index
            }
            None => false,
        };

        let started = if was_playing {
            Ok(())
        } else {
            match start() {
                Ok(handle) => {
                    inner.turns[index].is_playing = true;
                    inner.playing = Some(PlayingSlot { index, handle });
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };

        persist(&self.path, &inner.turns)?;
        started
    }

    /// Clear the playing flag once the owned handle reports finished
    ///
    /// # Errors
    ///
    /// Returns error if the history cannot be written to disk
    pub fn reap_finished(&self) -> Result<()> {
        let mut inner = self.lock();
        let done = inner
            .playing
            .as_ref()
            .is_some_and(|slot| slot.handle.is_finished());
        if !done {
            return Ok(());
        }

        if let Some(slot) = inner.playing.take() {
            if let Some(turn) = inner.turns.get_mut(slot.index) {
                turn.is_playing = false;
            }
        }
        persist(&self.path, &inner.turns)
    }

    /// Remove the turn at `index`, stopping it if it was playing
    ///
    /// # Errors
    ///
    /// Returns error if `index` is out of range or the history cannot
    /// be written to disk
    pub fn remove(&self, index: usize) -> Result<()> {
        let mut inner = self.lock();
        if index >= inner.turns.len() {
            return Err(Error::History(format!("no chat entry at index {index}")));
        }

        match &mut inner.playing {
            Some(slot) if slot.index == index => {
                slot.handle.stop();
                inner.playing = None;
            }
            Some(slot) if slot.index > index => {
                // Entries above the removed one shift down
                slot.index -= 1;
            }
            _ => {}
        }

        inner.turns.remove(index);
        persist(&self.path, &inner.turns)
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn persist(path: &Path, turns: &[ChatTurn]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::History(format!("cannot create history directory: {e}")))?;
    }

    let json = serde_json::to_string_pretty(turns)
        .map_err(|e| Error::History(format!("cannot serialize chat history: {e}")))?;
    fs::write(path, json).map_err(|e| Error::History(format!("cannot persist chat history: {e}")))
}
