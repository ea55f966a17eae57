// Integration tests for AI turns
//
// A turn streams text into the transcript, cuts it into sentences, and
// speaks them in order even when synthesis finishes out of order.

mod common;

use anyhow::Result;
use common::{RecordingSink, ScriptedAi, SinkProbe, StreamScript};
use speech_buddy::ai::{fallback, AiServices, HistoryEntry, Role};
use speech_buddy::conversation::{Orchestrator, PlaybackQueue, RoomEvent, Transcript};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    orchestrator: Orchestrator,
    transcript: Arc<Mutex<Transcript>>,
    events: broadcast::Receiver<RoomEvent>,
    probe: SinkProbe,
}

fn harness(ai: AiServices, streaming: bool) -> Harness {
    let (sink, probe) = RecordingSink::new(Duration::from_millis(5));
    let (playback, _task) = PlaybackQueue::spawn(sink, 24_000);
    let transcript = Arc::new(Mutex::new(Transcript::new()));
    let (tx, events) = broadcast::channel(64);

    Harness {
        orchestrator: Orchestrator::new(ai, playback, Arc::clone(&transcript), tx, streaming),
        transcript,
        events,
        probe,
    }
}

fn child_says(text: &str) -> Vec<HistoryEntry> {
    vec![HistoryEntry {
        text: text.to_string(),
        role: Role::User,
    }]
}

fn topic() -> (String, Vec<String>) {
    ("Động vật".to_string(), vec!["con chó".to_string()])
}

#[tokio::test]
async fn test_streamed_turn_updates_transcript_and_speaks_sentences() -> Result<()> {
    let ai = ScriptedAi::streaming(&["Chào ", "bé. Hôm nay", " bé thế nào?", " Tốt"]);
    let (scripted, services) = ai.services();
    let mut h = harness(services, true);
    let (topic, vocabulary) = topic();

    let outcome = h
        .orchestrator
        .run_turn(&child_says("Con chó"), &topic, &vocabulary)
        .await;
    timeout(WAIT, h.orchestrator.playback().wait_idle()).await?;

    assert!(outcome.completed);
    assert_eq!(outcome.text, "Chào bé. Hôm nay bé thế nào? Tốt");
    assert_eq!(outcome.sentences, 3);

    let transcript = h.transcript.lock().await;
    assert_eq!(transcript.messages()[outcome.index].text, outcome.text);

    let mut updates = Vec::new();
    while let Ok(event) = h.events.try_recv() {
        if let RoomEvent::MessageUpdated { text, .. } = event {
            updates.push(text);
        }
    }
    assert_eq!(
        updates,
        vec![
            "Chào ",
            "Chào bé. Hôm nay",
            "Chào bé. Hôm nay bé thế nào?",
            "Chào bé. Hôm nay bé thế nào? Tốt",
        ]
    );

    assert_eq!(
        h.probe.played(),
        vec!["Chào bé.", "Hôm nay bé thế nào?", "Tốt"]
    );
    assert_eq!(scripted.synthesized().len(), 3);
    assert_eq!(h.probe.max_active(), 1);

    Ok(())
}

#[tokio::test]
async fn test_slow_first_synthesis_still_plays_first() -> Result<()> {
    let ai = ScriptedAi::streaming(&["Câu một dài lắm. ", "Câu hai. ", "Câu ba."])
        .with_synth_delay("Câu một dài lắm.", Duration::from_millis(150));
    let (scripted, services) = ai.services();
    let h = harness(services, true);
    let (topic, vocabulary) = topic();

    h.orchestrator
        .run_turn(&child_says("Chào"), &topic, &vocabulary)
        .await;
    timeout(WAIT, h.orchestrator.playback().wait_idle()).await?;

    // Synthesis finished out of order...
    assert_eq!(scripted.synthesized()[2], "Câu một dài lắm.");
    // ...playback did not
    assert_eq!(h.probe.played(), vec!["Câu một dài lắm.", "Câu hai.", "Câu ba."]);

    Ok(())
}

#[tokio::test]
async fn test_stream_failure_replaces_message_with_apology() -> Result<()> {
    let ai = ScriptedAi {
        stream: StreamScript::FailAfter(vec!["Con chó ".to_string(), "kêu. Và".to_string()]),
        ..ScriptedAi::default()
    };
    let (scripted, services) = ai.services();
    let h = harness(services, true);
    let (topic, vocabulary) = topic();

    let outcome = h
        .orchestrator
        .run_turn(&child_says("Chó"), &topic, &vocabulary)
        .await;
    timeout(WAIT, h.orchestrator.playback().wait_idle()).await?;

    assert!(!outcome.completed);
    assert_eq!(outcome.text, fallback::STREAM_APOLOGY);
    let transcript = h.transcript.lock().await;
    assert_eq!(transcript.messages()[outcome.index].text, fallback::STREAM_APOLOGY);

    // The sentence finished before the failure is still spoken; the apology is not
    assert_eq!(h.probe.played(), vec!["Con chó kêu."]);
    assert!(!scripted
        .synthesized()
        .iter()
        .any(|t| t == fallback::STREAM_APOLOGY));

    Ok(())
}

#[tokio::test]
async fn test_stream_that_fails_to_open_apologizes() -> Result<()> {
    let ai = ScriptedAi {
        stream: StreamScript::FailToOpen,
        ..ScriptedAi::default()
    };
    let (_scripted, services) = ai.services();
    let h = harness(services, true);
    let (topic, vocabulary) = topic();

    let outcome = h
        .orchestrator
        .run_turn(&child_says("Chó"), &topic, &vocabulary)
        .await;

    assert!(!outcome.completed);
    assert_eq!(outcome.sentences, 0);
    assert_eq!(outcome.text, fallback::STREAM_APOLOGY);
    Ok(())
}

#[tokio::test]
async fn test_whole_reply_mode_speaks_every_sentence() -> Result<()> {
    let ai = ScriptedAi {
        reply: Some("Giỏi lắm! Con chó kêu gâu gâu.".to_string()),
        ..ScriptedAi::default()
    };
    let (_scripted, services) = ai.services();
    let h = harness(services, false);
    let (topic, vocabulary) = topic();

    let outcome = h
        .orchestrator
        .run_turn(&child_says("Con chó"), &topic, &vocabulary)
        .await;
    timeout(WAIT, h.orchestrator.playback().wait_idle()).await?;

    assert!(outcome.completed);
    assert_eq!(outcome.sentences, 2);
    assert_eq!(h.probe.played(), vec!["Giỏi lắm!", "Con chó kêu gâu gâu."]);
    Ok(())
}

#[tokio::test]
async fn test_failed_synthesis_skips_only_that_sentence() -> Result<()> {
    let ai = ScriptedAi {
        synth_failures: vec!["Hai.".to_string()],
        ..ScriptedAi::streaming(&["Một. Hai. Ba."])
    };
    let (_scripted, services) = ai.services();
    let h = harness(services, true);
    let (topic, vocabulary) = topic();

    h.orchestrator
        .run_turn(&child_says("Đếm"), &topic, &vocabulary)
        .await;
    timeout(WAIT, h.orchestrator.playback().wait_idle()).await?;

    assert_eq!(h.probe.played(), vec!["Một.", "Ba."]);
    Ok(())
}

#[tokio::test]
async fn test_empty_history_gets_fixed_reply_without_model_call() -> Result<()> {
    let (scripted, services) = ScriptedAi::default().services();
    let h = harness(services, true);
    let (topic, vocabulary) = topic();

    let blank = vec![HistoryEntry {
        text: "   ".to_string(),
        role: Role::User,
    }];
    let outcome = h.orchestrator.run_turn(&blank, &topic, &vocabulary).await;

    assert_eq!(outcome.text, fallback::REPLY_ON_EMPTY_HISTORY);
    assert!(scripted.histories.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_speak_now_queues_one_clip() -> Result<()> {
    let (_scripted, services) = ScriptedAi::default().services();
    let h = harness(services, true);

    h.orchestrator.speak_now("Xin chào bé! Bé khỏe không?").await?;
    timeout(WAIT, h.orchestrator.playback().wait_idle()).await?;

    assert_eq!(h.probe.played(), vec!["Xin chào bé! Bé khỏe không?"]);
    Ok(())
}
