//! End-to-end pipeline tests against a scripted backend.

use async_trait::async_trait;
use phrasegen::llm::{Invocation, InvokeError, LlmBackend};
use phrasegen::orchestrator::Orchestrator;
use phrasegen::types::{
    BatchErrorKind, GenerationPreferences, GenerationRequest, GenerationResult,
    ProficiencyLevel, ProgressUpdate, normalize_dedup_key,
};
use proptest::prelude::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend that replays a scripted sequence of responses, then fails.
struct ScriptedBackend {
    script: Mutex<Vec<Result<String, InvokeError>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<String, InvokeError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, _inv: Invocation) -> Result<String, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            Err(InvokeError::Unclassified("script exhausted".to_string()))
        } else {
            script.remove(0)
        }
    }
}

/// Backend that mints a fresh unique batch of phrases on every call.
struct GeneratorBackend {
    per_call: usize,
    counter: AtomicUsize,
}

impl GeneratorBackend {
    fn new(per_call: usize) -> Arc<Self> {
        Arc::new(Self {
            per_call,
            counter: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LlmBackend for GeneratorBackend {
    async fn invoke(&self, _inv: Invocation) -> Result<String, InvokeError> {
        let start = self.counter.fetch_add(self.per_call, Ordering::SeqCst);
        let phrases: Vec<_> = (start..start + self.per_call)
            .map(|i| record(&format!("Phrase number {i}")))
            .collect();
        Ok(json!({ "phrases": phrases }).to_string())
    }
}

fn record(english: &str) -> serde_json::Value {
    json!({
        "english": english,
        "thai": "ทดสอบ",
        "thaiMasculine": "ทดสอบครับ",
        "thaiFeminine": "ทดสอบค่ะ",
        "pronunciation": "tod-sorb"
    })
}

fn body(title: Option<&str>, englishes: &[&str]) -> String {
    let phrases: Vec<_> = englishes.iter().map(|e| record(e)).collect();
    match title {
        Some(t) => json!({ "cleverTitle": t, "phrases": phrases }).to_string(),
        None => json!({ "phrases": phrases }).to_string(),
    }
}

fn orchestrator(backend: Arc<dyn LlmBackend>, batch_size: usize) -> Orchestrator {
    Orchestrator::with_backend(backend, batch_size, Duration::from_secs(1))
}

fn request(total: usize) -> GenerationRequest {
    GenerationRequest::new(
        GenerationPreferences::new(ProficiencyLevel::Intermediate),
        total,
    )
}

async fn run(backend: Arc<dyn LlmBackend>, batch_size: usize, total: usize) -> GenerationResult {
    orchestrator(backend, batch_size).run(request(total)).await
}

#[tokio::test]
async fn clean_single_batch_run_has_no_summary() {
    let backend = ScriptedBackend::new(vec![Ok(body(
        Some("Greetings"),
        &["One", "Two", "Three", "Four", "Five"],
    ))]);

    let result = run(backend.clone(), 5, 5).await;
    assert_eq!(result.phrases.len(), 5);
    assert_eq!(result.title.as_deref(), Some("Greetings"));
    assert!(result.errors.is_empty());
    assert!(result.error_summary.is_none());
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn malformed_json_fails_completely_without_retry() {
    let backend = ScriptedBackend::new(vec![Ok("I'm sorry, here are your phrases:".to_string())]);

    let result = run(backend.clone(), 5, 5).await;
    assert!(result.phrases.is_empty());
    assert_eq!(backend.calls(), 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].error.kind, BatchErrorKind::ParseFailure);
    assert!(result.is_complete_failure());
    let summary = result.error_summary.unwrap();
    assert_eq!(summary.user_message, "failed completely");
}

#[tokio::test(start_paused = true)]
async fn timeout_then_success_records_the_failed_attempt() {
    let backend = ScriptedBackend::new(vec![
        Err(InvokeError::Network("request timed out after 1s".to_string())),
        Ok(body(None, &["One", "Two", "Three", "Four", "Five"])),
    ]);

    let result = run(backend.clone(), 5, 5).await;
    assert_eq!(result.phrases.len(), 5);
    assert_eq!(backend.calls(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].error.kind, BatchErrorKind::NetworkFailure);
    assert_eq!(result.errors[0].batch_index, 0);
    // Target reached, so the summary reads as a minor-issues completion.
    let summary = result.error_summary.unwrap();
    assert!(summary.user_message.starts_with("completed with minor issues"));
}

#[tokio::test]
async fn partial_validation_keeps_good_phrases_without_retry() {
    let mut broken = record("Broken");
    broken.as_object_mut().unwrap().remove("pronunciation");
    let phrases = vec![
        record("One"),
        record("Two"),
        record("Three"),
        record("Four"),
        broken,
    ];
    let backend = ScriptedBackend::new(vec![
        Ok(json!({ "phrases": phrases }).to_string()),
        Ok(body(None, &["Five"])),
    ]);

    let result = run(backend.clone(), 5, 5).await;
    assert_eq!(result.phrases.len(), 5);
    // Batch 1 was final after a single call despite the rejection.
    assert_eq!(backend.calls(), 2);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors[0].error.kind,
        BatchErrorKind::ValidationFailure
    );
}

#[tokio::test]
async fn cross_batch_duplicates_are_dropped() {
    let backend = ScriptedBackend::new(vec![
        Ok(body(None, &["Hello", "Goodbye"])),
        Ok(body(None, &["Hello", "Thanks"])),
        Ok(body(None, &["Sorry"])),
    ]);

    let result = run(backend.clone(), 2, 4).await;
    assert_eq!(result.phrases.len(), 4);
    let hellos = result
        .phrases
        .iter()
        .filter(|p| p.english == "Hello")
        .count();
    assert_eq!(hellos, 1);
}

#[tokio::test]
async fn dedup_is_case_and_whitespace_insensitive() {
    let backend = ScriptedBackend::new(vec![
        Ok(body(None, &["Hello there"])),
        Ok(body(None, &["  hello   THERE ", "Goodbye"])),
    ]);

    let result = run(backend.clone(), 2, 2).await;
    let keys: Vec<String> = result.phrases.iter().map(|p| p.dedup_key()).collect();
    let mut deduped = keys.clone();
    deduped.dedup();
    assert_eq!(keys, deduped);
    assert!(result.phrases.iter().any(|p| p.english == "Goodbye"));
}

#[tokio::test]
async fn title_is_first_writer_wins() {
    let backend = ScriptedBackend::new(vec![
        Ok(body(None, &["One"])),
        Ok(body(Some("Foo"), &["Two"])),
        Ok(body(Some("Bar"), &["Three"])),
    ]);

    let result = run(backend.clone(), 1, 3).await;
    assert_eq!(result.title.as_deref(), Some("Foo"));
}

#[tokio::test]
async fn progress_is_monotonic_and_fires_every_batch() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    let backend = ScriptedBackend::new(vec![
        Ok(body(None, &["One", "Two"])),
        Ok("garbage".to_string()),
        Ok(body(None, &["Three", "Four"])),
    ]);

    let request = request(6).with_progress(Arc::new(move |update: ProgressUpdate| {
        sink.lock().unwrap().push(update);
    }));
    let result = orchestrator(backend, 2).run(request).await;

    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 3);
    let completed: Vec<usize> = updates.iter().map(|u| u.completed).collect();
    assert!(completed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(updates[0].total, 6);
    // The failed middle batch still produced an update, with no phrases.
    assert!(updates[1].latest_phrases.is_empty());
    assert_eq!(result.phrases.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_charge_the_batch_and_terminate() {
    let backend = ScriptedBackend::new(vec![
        Err(InvokeError::Network("down".to_string())),
        Err(InvokeError::Network("down".to_string())),
        Err(InvokeError::Network("down".to_string())),
        Ok(body(None, &["One", "Two", "Three"])),
    ]);

    let result = run(backend.clone(), 3, 6).await;
    // Batch 1 burned three attempts and its nominal size; batch 2 delivered.
    assert_eq!(backend.calls(), 4);
    assert_eq!(result.phrases.len(), 3);
    assert_eq!(result.errors.len(), 3);
    assert!(result.errors.iter().all(|e| e.batch_index == 0));
    let summary = result.error_summary.unwrap();
    assert_eq!(summary.user_message, "finished with 3/6 cards, issues: network_failure");
}

#[tokio::test(start_paused = true)]
async fn run_terminates_when_every_batch_fails() {
    // Every call fails with a retryable error; the loop must still end.
    let backend = ScriptedBackend::new(Vec::new());

    let result = run(backend.clone(), 5, 10).await;
    assert!(result.phrases.is_empty());
    // 2 batches of nominal size 5, 3 attempts each.
    assert_eq!(backend.calls(), 6);
    assert_eq!(result.error_summary.unwrap().user_message, "failed completely");
}

#[tokio::test]
async fn duplicate_only_batches_do_not_loop_forever() {
    // The backend keeps returning the same phrase.
    struct Stuck;
    #[async_trait]
    impl LlmBackend for Stuck {
        async fn invoke(&self, _inv: Invocation) -> Result<String, InvokeError> {
            Ok(body(None, &["Hello"]))
        }
    }

    let result = run(Arc::new(Stuck), 3, 9).await;
    assert_eq!(result.phrases.len(), 1);
}

#[tokio::test]
async fn over_delivery_is_truncated_to_the_request() {
    // 4 per call against a total of 6: the second batch over-delivers.
    let result = run(GeneratorBackend::new(4), 4, 6).await;
    assert_eq!(result.phrases.len(), 6);
    assert!(result.error_summary.is_none());
}

#[tokio::test]
async fn zero_count_request_is_a_no_op() {
    let backend = ScriptedBackend::new(Vec::new());
    let result = run(backend.clone(), 5, 0).await;
    assert!(result.phrases.is_empty());
    assert!(result.errors.is_empty());
    assert!(result.error_summary.is_none());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn accepted_order_is_preserved() {
    let backend = ScriptedBackend::new(vec![
        Ok(body(None, &["B", "A"])),
        Ok(body(None, &["D", "C"])),
    ]);

    let result = run(backend, 2, 4).await;
    let order: Vec<&str> = result.phrases.iter().map(|p| p.english.as_str()).collect();
    assert_eq!(order, vec!["B", "A", "D", "C"]);
}

proptest! {
    #[test]
    fn dedup_key_is_idempotent(text in ".{0,60}") {
        let once = normalize_dedup_key(&text);
        prop_assert_eq!(normalize_dedup_key(&once), once.clone());
    }

    #[test]
    fn dedup_key_ignores_case_and_spacing(words in proptest::collection::vec("[a-zA-Z]{1,8}", 1..5)) {
        let tight = words.join(" ");
        let sloppy = format!("  {}  ", words.join("   ")).to_uppercase();
        prop_assert_eq!(normalize_dedup_key(&tight), normalize_dedup_key(&sloppy));
    }

    #[test]
    fn result_never_exceeds_requested_count(
        total in 0usize..30,
        batch_size in 1usize..8,
        per_call in 1usize..10,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let result = runtime.block_on(run(GeneratorBackend::new(per_call), batch_size, total));
        prop_assert!(result.phrases.len() <= total);

        let mut keys: Vec<String> = result.phrases.iter().map(|p| p.dedup_key()).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), before);
    }
}
