// End-to-end Search engine scenarios against synthetic in-memory sources.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ctsearch_core::{
    AnySource, CancellationToken, Cacher, CtSearchError, ErrorBehavior, Search, Sourcer,
};
use tokio::sync::mpsc;

fn sample_der(subject_alt: &str) -> Vec<u8> {
    let certified = rcgen::generate_simple_self_signed(vec![subject_alt.to_string()]).unwrap();
    certified.cert.der().to_vec()
}

/// Emits a fixed list of DER blobs, then returns.
struct StaticSource {
    blobs: Vec<Vec<u8>>,
}

#[async_trait]
impl Sourcer for StaticSource {
    async fn source(
        &self,
        _cancel: CancellationToken,
        out: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), CtSearchError> {
        for blob in &self.blobs {
            if out.send(blob.clone()).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Sends nothing; blocks until its cancellation token fires, then returns.
struct StallingSource;

#[async_trait]
impl Sourcer for StallingSource {
    async fn source(
        &self,
        cancel: CancellationToken,
        _out: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), CtSearchError> {
        cancel.cancelled().await;
        Err(CtSearchError::Cancelled)
    }
}

/// Always returns an unrecoverable error without sending anything.
struct FailingSource;

#[async_trait]
impl Sourcer for FailingSource {
    async fn source(
        &self,
        _cancel: CancellationToken,
        _out: mpsc::Sender<Vec<u8>>,
    ) -> Result<(), CtSearchError> {
        Err(CtSearchError::Source("synthetic failure".into()))
    }
}

fn collecting_callback() -> (
    ctsearch_core::MatchCallback,
    Arc<Mutex<Vec<String>>>,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let callback_seen = Arc::clone(&seen);
    let callback: ctsearch_core::MatchCallback = Arc::new(move |cert| {
        callback_seen.lock().unwrap().push(cert.subject().to_string());
    });
    (callback, seen)
}

#[tokio::test]
async fn delivers_every_match_from_a_single_source() {
    let blobs = vec![sample_der("one.example"), sample_der("two.example")];
    let (callback, seen) = collecting_callback();

    let search = Search {
        sources: vec![Box::new(StaticSource { blobs }) as AnySource],
        der_filter: None,
        filter: Some(Arc::new(|_cert| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn der_filter_runs_before_parsing() {
    let blobs = vec![vec![0u8, 1, 2, 3], sample_der("kept.example")];
    let (callback, seen) = collecting_callback();

    let search = Search {
        sources: vec![Box::new(StaticSource { blobs }) as AnySource],
        // Reject anything that isn't the handful of bytes rcgen produces.
        der_filter: Some(Arc::new(|der| der.len() > 16)),
        filter: None,
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn single_source_with_an_inline_duplicate_reports_each_distinct_cert_once() {
    let a = sample_der("a.example");
    let b = sample_der("b.example");
    let c = sample_der("c.example");
    let (callback, seen) = collecting_callback();

    let search = Search {
        sources: vec![Box::new(StaticSource {
            blobs: vec![a.clone(), b, c, a],
        }) as AnySource],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: Some(Cacher::sha256_map()),
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn certificate_parse_failure_is_skipped_not_fatal() {
    let (callback, seen) = collecting_callback();

    let search = Search {
        sources: vec![Box::new(StaticSource {
            blobs: vec![vec![0xDE, 0xAD, 0xBE, 0xEF], sample_der("valid.example")],
        }) as AnySource],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn exact_cacher_drops_duplicate_matches_across_sources() {
    let shared = sample_der("dup.example");
    let (callback, seen) = collecting_callback();

    let search = Search {
        sources: vec![
            Box::new(StaticSource {
                blobs: vec![shared.clone()],
            }) as AnySource,
            Box::new(StaticSource {
                blobs: vec![shared],
            }) as AnySource,
        ],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: Some(Cacher::sha256_map()),
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_policy_propagates_source_failure_as_the_result() {
    let (callback, _seen) = collecting_callback();

    let search = Search {
        sources: vec![
            Box::new(FailingSource) as AnySource,
            Box::new(StaticSource {
                blobs: vec![sample_der("slow.example")],
            }) as AnySource,
        ],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    let result = search.execute(CancellationToken::new()).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn continue_policy_tolerates_a_failing_source() {
    let (callback, seen) = collecting_callback();

    let search = Search {
        sources: vec![
            Box::new(FailingSource) as AnySource,
            Box::new(StaticSource {
                blobs: vec![sample_der("survivor.example")],
            }) as AnySource,
        ],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Continue,
        progress_callback: None,
        progress_interval: 0,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn progress_callback_fires_every_interval() {
    let blobs: Vec<Vec<u8>> = (0..5)
        .map(|i| sample_der(&format!("host{i}.example")))
        .collect();
    let (callback, _seen) = collecting_callback();
    let progress_hits = Arc::new(Mutex::new(Vec::new()));
    let progress_hits_cb = Arc::clone(&progress_hits);

    let search = Search {
        sources: vec![Box::new(StaticSource { blobs }) as AnySource],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: Some(Arc::new(move |n| progress_hits_cb.lock().unwrap().push(n))),
        progress_interval: 2,
    };

    search.execute(CancellationToken::new()).await.unwrap();
    assert_eq!(*progress_hits.lock().unwrap(), vec![2, 4]);
}

#[tokio::test]
async fn rejects_config_with_no_filters() {
    let (callback, _seen) = collecting_callback();
    let search = Search {
        sources: vec![Box::new(StaticSource { blobs: vec![] }) as AnySource],
        der_filter: None,
        filter: None,
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };
    let err = search.execute(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CtSearchError::Config(_)));
}

#[tokio::test]
async fn external_cancellation_mid_execution_reports_cancelled_not_source() {
    let (callback, _seen) = collecting_callback();
    let cancel = CancellationToken::new();

    let search = Search {
        sources: vec![Box::new(StallingSource) as AnySource],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };

    let cancel_from_caller = cancel.clone();
    let task = tokio::spawn(search.execute(cancel));
    // Give the source task and the external-cancellation forwarder a chance
    // to start awaiting their tokens before the caller cancels mid-flight.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    cancel_from_caller.cancel();

    let result = task.await.unwrap();
    assert!(
        matches!(result, Err(CtSearchError::Cancelled)),
        "expected Cancelled, got {result:?}"
    );
}

#[tokio::test]
async fn rejects_already_cancelled_token() {
    let (callback, _seen) = collecting_callback();
    let search = Search {
        sources: vec![Box::new(StaticSource { blobs: vec![] }) as AnySource],
        der_filter: None,
        filter: Some(Arc::new(|_| true)),
        match_callback: callback,
        cacher: None,
        error_behavior: ErrorBehavior::Cancel,
        progress_callback: None,
        progress_interval: 0,
    };
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = search.execute(cancel).await.unwrap_err();
    assert!(matches!(err, CtSearchError::Cancelled));
}
