//! Chat history state machine tests
//!
//! Playback handles are faked so the store runs without audio hardware.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use talkback::Error;
use talkback::client::{ChatHistory, ChatTurn, TurnAudio};

/// Fake playback handle observed through shared flags
struct FakeAudio {
    stopped: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl TurnAudio for FakeAudio {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

fn fake_audio() -> (Box<dyn TurnAudio>, Arc<AtomicBool>, Arc<AtomicBool>) {
    let stopped = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let handle = Box::new(FakeAudio {
        stopped: Arc::clone(&stopped),
        finished: Arc::clone(&finished),
    });
    (handle, stopped, finished)
}

fn history_at(dir: &tempfile::TempDir) -> ChatHistory {
    ChatHistory::load(dir.path().join("chat_history.json")).unwrap()
}

#[test]
fn test_append_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_history.json");

    let history = ChatHistory::load(path.clone()).unwrap();
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();
    history.append(ChatTurn::new("two", "/audio/2.mp3")).unwrap();

    let reloaded = ChatHistory::load(path).unwrap();
    let turns = reloaded.turns();

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "one");
    assert_eq!(turns[1].audio_url, "/audio/2.mp3");
}

#[test]
fn test_missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);

    assert!(history.is_empty());
}

#[test]
fn test_reload_clears_stale_playing_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_history.json");

    // The persisted wire format, with a stale playing flag
    std::fs::write(
        &path,
        r#"[{"text":"one","audioUrl":"/audio/1.mp3","isPlaying":true}]"#,
    )
    .unwrap();

    let history = ChatHistory::load(path).unwrap();
    let turns = history.turns();

    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].audio_url, "/audio/1.mp3");
    assert!(!turns[0].is_playing);
}

#[test]
fn test_corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_history.json");
    std::fs::write(&path, "not json").unwrap();

    let err = ChatHistory::load(path).unwrap_err();
    assert!(matches!(err, Error::History(_)));
}

#[test]
fn test_remove_excises_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();
    history.append(ChatTurn::new("two", "/audio/2.mp3")).unwrap();
    history.append(ChatTurn::new("three", "/audio/3.mp3")).unwrap();

    history.remove(1).unwrap();

    let turns = history.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].text, "one");
    assert_eq!(turns[1].text, "three");
}

#[test]
fn test_toggle_marks_the_entry_playing() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();

    let (handle, _, _) = fake_audio();
    history.toggle(0, move || Ok(handle)).unwrap();

    assert!(history.turns()[0].is_playing);
}

#[test]
fn test_toggle_same_entry_stops_without_restarting() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();

    let (handle, stopped, _) = fake_audio();
    history.toggle(0, move || Ok(handle)).unwrap();

    // Stopping must not invoke the start closure
    history
        .toggle(0, || Err(Error::Audio("unexpected restart".to_string())))
        .unwrap();

    assert!(stopped.load(Ordering::SeqCst));
    assert!(!history.turns()[0].is_playing);
}

#[test]
fn test_toggle_exclusivity_stops_the_previous_entry() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();
    history.append(ChatTurn::new("two", "/audio/2.mp3")).unwrap();

    let (first, first_stopped, _) = fake_audio();
    history.toggle(0, move || Ok(first)).unwrap();

    let (second, _, _) = fake_audio();
    history.toggle(1, move || Ok(second)).unwrap();

    assert!(first_stopped.load(Ordering::SeqCst));
    let turns = history.turns();
    assert!(!turns[0].is_playing);
    assert!(turns[1].is_playing);
}

#[test]
fn test_remove_playing_entry_stops_it() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();
    history.append(ChatTurn::new("two", "/audio/2.mp3")).unwrap();

    let (handle, stopped, _) = fake_audio();
    history.toggle(0, move || Ok(handle)).unwrap();

    history.remove(0).unwrap();

    assert!(stopped.load(Ordering::SeqCst));
    let turns = history.turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "two");
    assert!(!turns[0].is_playing);
}

#[test]
fn test_removing_below_the_playing_entry_shifts_the_slot() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();
    history.append(ChatTurn::new("two", "/audio/2.mp3")).unwrap();
    history.append(ChatTurn::new("three", "/audio/3.mp3")).unwrap();

    let (handle, stopped, _) = fake_audio();
    history.toggle(2, move || Ok(handle)).unwrap();

    history.remove(0).unwrap();

    let turns = history.turns();
    assert_eq!(turns.len(), 2);
    assert!(!turns[0].is_playing);
    assert!(turns[1].is_playing);

    // The slot followed the shifted entry: toggling it stops, not restarts
    history
        .toggle(1, || Err(Error::Audio("unexpected restart".to_string())))
        .unwrap();
    assert!(stopped.load(Ordering::SeqCst));
    assert!(!history.turns()[1].is_playing);
}

#[test]
fn test_reap_clears_the_flag_once_audio_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();

    let (handle, _, finished) = fake_audio();
    history.toggle(0, move || Ok(handle)).unwrap();

    // Still playing: reap is a no-op
    history.reap_finished().unwrap();
    assert!(history.turns()[0].is_playing);

    finished.store(true, Ordering::SeqCst);
    history.reap_finished().unwrap();
    assert!(!history.turns()[0].is_playing);
}

#[test]
fn test_out_of_range_indices_error() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);

    let toggle_err = history
        .toggle(0, || Err(Error::Audio("unreachable".to_string())))
        .unwrap_err();
    assert!(matches!(toggle_err, Error::History(_)));

    let remove_err = history.remove(0).unwrap_err();
    assert!(matches!(remove_err, Error::History(_)));
}

#[test]
fn test_failed_start_leaves_nothing_playing() {
    let dir = tempfile::tempdir().unwrap();
    let history = history_at(&dir);
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();

    let err = history
        .toggle(0, || Err(Error::Audio("device busy".to_string())))
        .unwrap_err();

    assert!(matches!(err, Error::Audio(_)));
    assert!(!history.turns()[0].is_playing);
}

#[test]
fn test_every_mutation_rewrites_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_history.json");

    let history = ChatHistory::load(path.clone()).unwrap();
    history.append(ChatTurn::new("one", "/audio/1.mp3")).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"one\""));
    assert!(json.contains("\"audioUrl\""));

    history.remove(0).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 0);
}
