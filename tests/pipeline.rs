//! End-to-end pipeline tests over stubbed stages

use std::sync::Arc;

use talkback::pipeline::{AudioBlob, Pipeline};
use talkback::reply::ReplyRules;
use talkback::Error;

mod common;
use common::{STUB_AUDIO_URL, SttOutcome, StubPublisher, StubStt, StubTts, stub_pipeline};

fn wav_blob() -> AudioBlob {
    AudioBlob::wav(vec![0u8; 16])
}

#[tokio::test]
async fn test_turn_with_empty_rule_table_echoes_transcript() {
    let pipeline = stub_pipeline(SttOutcome::Transcript("hello"), ReplyRules::none());

    let reply = pipeline.process(wav_blob()).await.unwrap();

    assert_eq!(
        reply.text,
        "You said: \"hello\". How can I assist you further?"
    );
    assert_eq!(reply.audio_url, STUB_AUDIO_URL);
}

#[tokio::test]
async fn test_turn_with_default_rules_answers_joke() {
    let pipeline = stub_pipeline(
        SttOutcome::Transcript("tell me a joke"),
        ReplyRules::default(),
    );

    let reply = pipeline.process(wav_blob()).await.unwrap();

    assert_eq!(
        reply.text,
        "Why don't scientists trust atoms? Because they make up everything!"
    );
    assert_eq!(reply.audio_url, STUB_AUDIO_URL);
}

#[tokio::test]
async fn test_empty_transcript_still_produces_a_turn() {
    let pipeline = stub_pipeline(SttOutcome::Transcript(""), ReplyRules::default());

    let reply = pipeline.process(wav_blob()).await.unwrap();

    assert_eq!(reply.text, "You said: \"\". How can I assist you further?");
}

#[tokio::test]
async fn test_upload_failure_fails_the_turn() {
    let pipeline = stub_pipeline(SttOutcome::UploadError, ReplyRules::default());

    let err = pipeline.process(wav_blob()).await.unwrap_err();
    assert!(matches!(err, Error::Upload(_)));
}

#[tokio::test]
async fn test_job_creation_failure_fails_the_turn() {
    let pipeline = stub_pipeline(SttOutcome::JobCreationError, ReplyRules::default());

    let err = pipeline.process(wav_blob()).await.unwrap_err();
    assert!(matches!(err, Error::JobCreation(_)));
}

#[tokio::test]
async fn test_terminal_job_failure_fails_the_turn() {
    let pipeline = stub_pipeline(SttOutcome::TranscriptionFailed, ReplyRules::default());

    let err = pipeline.process(wav_blob()).await.unwrap_err();
    assert!(matches!(err, Error::TranscriptionFailed(_)));
}

#[tokio::test]
async fn test_poll_timeout_fails_the_turn() {
    let pipeline = stub_pipeline(SttOutcome::TranscriptionTimeout, ReplyRules::default());

    let err = pipeline.process(wav_blob()).await.unwrap_err();
    assert!(matches!(err, Error::TranscriptionTimeout(_)));
}

#[tokio::test]
async fn test_synthesis_failure_fails_the_turn() {
    let pipeline = Pipeline::new(
        Arc::new(StubStt::new(SttOutcome::Transcript("hello"))),
        ReplyRules::default(),
        Arc::new(StubTts::failing()),
        Arc::new(StubPublisher::ok()),
    );

    let err = pipeline.process(wav_blob()).await.unwrap_err();
    assert!(matches!(err, Error::Synthesis(_)));
}

#[tokio::test]
async fn test_publish_failure_fails_the_turn() {
    let pipeline = Pipeline::new(
        Arc::new(StubStt::new(SttOutcome::Transcript("hello"))),
        ReplyRules::default(),
        Arc::new(StubTts::ok()),
        Arc::new(StubPublisher::failing()),
    );

    let err = pipeline.process(wav_blob()).await.unwrap_err();
    assert!(matches!(err, Error::Publish(_)));
}

#[tokio::test]
async fn test_transcription_failure_short_circuits_later_stages() {
    let tts = Arc::new(StubTts::ok());
    let publisher = Arc::new(StubPublisher::ok());
    let pipeline = Pipeline::new(
        Arc::new(StubStt::new(SttOutcome::TranscriptionFailed)),
        ReplyRules::default(),
        tts.clone(),
        publisher.clone(),
    );

    pipeline.process(wav_blob()).await.unwrap_err();

    assert_eq!(tts.calls(), 0);
    assert_eq!(publisher.calls(), 0);
}

#[tokio::test]
async fn test_synthesis_failure_skips_publish() {
    let publisher = Arc::new(StubPublisher::ok());
    let pipeline = Pipeline::new(
        Arc::new(StubStt::new(SttOutcome::Transcript("hello"))),
        ReplyRules::default(),
        Arc::new(StubTts::failing()),
        publisher.clone(),
    );

    pipeline.process(wav_blob()).await.unwrap_err();

    assert_eq!(publisher.calls(), 0);
}
