// ChapterFetch - Segmented Audiobook Chapter Downloader
// Copyright (C) 2026 ChapterFetch Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! End-to-end pipeline tests over a scripted transport
//!
//! No network, no ffmpeg: [`MockTransport`] serves canned responses per
//! URL and counts requests; [`StubTranscoder`] copies the merged blob to
//! the output path.

use chapterfetch::audio::Transcoder;
use chapterfetch::download::{ChapterOutcome, ChapterScheduler, RetryPolicy, SchedulerConfig};
use chapterfetch::error::{PipelineError, Result};
use chapterfetch::manifest::StreamLocator;
use chapterfetch::session::{Session, SessionConfig};
use chapterfetch::transport::{Transport, TransportResponse};
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Scripted transport: each URL maps to a queue of responses, consumed
/// front to back; the last response repeats once the queue is drained.
#[derive(Default)]
struct MockTransport {
    routes: Mutex<HashMap<String, Vec<Result<TransportResponse>>>>,
    requests: AtomicUsize,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn respond(&self, url: &str, status: u16, body: &[u8]) {
        self.push(
            url,
            Ok(TransportResponse {
                status,
                body: body.to_vec(),
            }),
        );
    }

    fn fail_transient(&self, url: &str) {
        self.push(url, Err(PipelineError::network("connection reset", true)));
    }

    fn push(&self, url: &str, response: Result<TransportResponse>) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(response);
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        _headers: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<TransportResponse>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut routes = self.routes.lock().unwrap();
        let response = match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) if queue.len() == 1 => clone_response(&queue[0]),
            _ => Ok(TransportResponse {
                status: 404,
                body: Vec::new(),
            }),
        };
        Box::pin(async move { response })
    }
}

fn clone_response(r: &Result<TransportResponse>) -> Result<TransportResponse> {
    match r {
        Ok(resp) => Ok(resp.clone()),
        Err(PipelineError::NetworkError {
            message,
            is_transient,
        }) => Err(PipelineError::network(message.clone(), *is_transient)),
        Err(e) => Err(PipelineError::InvalidState(e.to_string())),
    }
}

/// Transcoder stand-in that copies the merged blob byte for byte
struct StubTranscoder;

impl Transcoder for StubTranscoder {
    fn transcode<'a>(&'a self, input: &'a Path, output: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tokio::fs::copy(input, output).await?;
            Ok(())
        })
    }

    fn output_extension(&self) -> &str {
        "mp3"
    }
}

struct Harness {
    transport: Arc<MockTransport>,
    scheduler: ChapterScheduler,
    output_dir: PathBuf,
    staging_root: PathBuf,
    _dirs: (TempDir, TempDir),
}

fn harness() -> Harness {
    let out = TempDir::new().unwrap();
    let staging = TempDir::new().unwrap();
    let transport = Arc::new(MockTransport::new());

    let config = SchedulerConfig {
        book_title: "book".to_string(),
        output_dir: out.path().to_path_buf(),
        staging_root: staging.path().to_path_buf(),
        retry: RetryPolicy {
            max_retries: 2,
            delay: Duration::ZERO,
        },
        ..SchedulerConfig::default()
    };
    let scheduler = ChapterScheduler::new(
        config,
        transport.clone(),
        Session::new(SessionConfig::default()),
        Arc::new(StubTranscoder),
    );

    Harness {
        transport,
        scheduler,
        output_dir: out.path().to_path_buf(),
        staging_root: staging.path().to_path_buf(),
        _dirs: (out, staging),
    }
}

const MANIFEST_URL: &str = "https://host.test/stream/book/ch1.m3u8";

fn playlist(segments: &[&str]) -> Vec<u8> {
    let mut text = String::from("#EXTM3U\n");
    for seg in segments {
        text.push_str(seg);
        text.push('\n');
    }
    text.into_bytes()
}

fn seg_url(name: &str) -> String {
    format!("https://host.test/stream/book/{}", name)
}

#[tokio::test]
async fn chapter_assembles_in_manifest_order() {
    let h = harness();
    h.transport.respond(
        MANIFEST_URL,
        200,
        &playlist(&["s0.ts", "s1.ts", "s2.ts"]),
    );
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");
    h.transport.respond(&seg_url("s1.ts"), 200, b"B");
    h.transport.respond(&seg_url("s2.ts"), 200, b"C");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.downloaded(), 1);
    let output = h.output_dir.join("book - chapter 1.mp3");
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"ABC");
    // Staging for the chapter is gone after a successful transcode.
    assert!(!h.staging_root.join("chapter_001").exists());
}

#[tokio::test]
async fn rerun_skips_completed_chapter_without_network() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts"]));
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");

    let locators = [StreamLocator::new(MANIFEST_URL)];
    let first = h.scheduler.run(&locators).await;
    assert_eq!(first.downloaded(), 1);

    let requests_after_first = h.transport.request_count();
    let second = h.scheduler.run(&locators).await;

    assert_eq!(second.skipped(), 1);
    assert_eq!(second.downloaded(), 0);
    assert_eq!(h.transport.request_count(), requests_after_first);
}

#[tokio::test]
async fn removed_output_is_downloaded_again() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts"]));
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");

    let locators = [StreamLocator::new(MANIFEST_URL)];
    let first = h.scheduler.run(&locators).await;
    assert_eq!(first.downloaded(), 1);

    // The completed output disappears between runs; the next run must
    // not trust the ledger entry and must download the chapter again.
    let output = h.output_dir.join("book - chapter 1.mp3");
    tokio::fs::remove_file(&output).await.unwrap();

    let second = h.scheduler.run(&locators).await;
    assert_eq!(second.downloaded(), 1);
    assert_eq!(second.skipped(), 0);
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"A");
}

#[tokio::test]
async fn preexisting_output_is_skipped() {
    let h = harness();
    let output = h.output_dir.join("book - chapter 1.mp3");
    tokio::fs::write(&output, b"from an earlier run").await.unwrap();

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.skipped(), 1);
    assert_eq!(h.transport.request_count(), 0);
    // The existing file is untouched.
    assert_eq!(
        tokio::fs::read(&output).await.unwrap(),
        b"from an earlier run"
    );
}

#[tokio::test]
async fn failing_chapter_does_not_abort_siblings() {
    let h = harness();
    let good = "https://host.test/stream/book/ch1.m3u8";
    let bad = "https://host.test/stream/book/ch2.m3u8";

    h.transport.respond(good, 200, &playlist(&["s0.ts"]));
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");
    h.transport.respond(bad, 500, b"");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(good), StreamLocator::new(bad)])
        .await;

    assert_eq!(summary.downloaded(), 1);
    assert_eq!(summary.failed(), 1);

    assert!(matches!(
        summary.chapters[0].outcome,
        ChapterOutcome::Done { .. }
    ));
    match &summary.chapters[1].outcome {
        ChapterOutcome::Failed { reason } => assert!(reason.contains("manifest unavailable")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(h.output_dir.join("book - chapter 1.mp3").exists());
    assert!(!h.output_dir.join("book - chapter 2.mp3").exists());
}

#[tokio::test]
async fn transient_segment_errors_are_retried_within_budget() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts"]));
    // Two failures, then success: exactly within a 2-retry budget.
    h.transport.fail_transient(&seg_url("s0.ts"));
    h.transport.fail_transient(&seg_url("s0.ts"));
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.downloaded(), 1);
}

#[tokio::test]
async fn segment_fails_once_retry_budget_is_exhausted() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts"]));
    // The single queued error repeats on every attempt.
    h.transport.fail_transient(&seg_url("s0.ts"));

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.failed(), 1);
    match &summary.chapters[0].outcome {
        ChapterOutcome::Failed { reason } => {
            assert!(reason.contains("3 attempts"), "reason: {}", reason)
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(!h.output_dir.join("book - chapter 1.mp3").exists());
}

#[tokio::test]
async fn client_error_status_fails_the_chapter_without_retries() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts", "s1.ts"]));
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");
    h.transport.respond(&seg_url("s1.ts"), 404, b"");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.failed(), 1);
    match &summary.chapters[0].outcome {
        ChapterOutcome::Failed { reason } => {
            assert!(reason.contains("404"), "reason: {}", reason);
            assert!(reason.contains("1 attempts"), "reason: {}", reason);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    // A 404 is deterministic: manifest + one request per segment, no
    // retry traffic.
    assert_eq!(h.transport.request_count(), 3);
}

#[tokio::test]
async fn server_error_statuses_consume_the_retry_budget() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts"]));
    // Two 503s, then success: within a 2-retry budget.
    h.transport.respond(&seg_url("s0.ts"), 503, b"");
    h.transport.respond(&seg_url("s0.ts"), 503, b"");
    h.transport.respond(&seg_url("s0.ts"), 200, b"A");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.downloaded(), 1);
    let output = h.output_dir.join("book - chapter 1.mp3");
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"A");
}

#[tokio::test]
async fn empty_segment_payload_still_completes() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, &playlist(&["s0.ts", "s1.ts"]));
    h.transport.respond(&seg_url("s0.ts"), 200, b"");
    h.transport.respond(&seg_url("s1.ts"), 200, b"B");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.downloaded(), 1);
    let output = h.output_dir.join("book - chapter 1.mp3");
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"B");
}

#[tokio::test]
async fn malformed_manifest_fails_the_chapter() {
    let h = harness();
    h.transport
        .respond(MANIFEST_URL, 200, b"<html>not a playlist</html>");

    let summary = h
        .scheduler
        .run(&[StreamLocator::new(MANIFEST_URL)])
        .await;

    assert_eq!(summary.failed(), 1);
    match &summary.chapters[0].outcome {
        ChapterOutcome::Failed { reason } => assert!(reason.contains("malformed")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn track_list_manifest_resolves_absolute_links() {
    let h = harness();
    let page = "https://host.test/post/some-book";
    let body = br#"<script>var tracks = [
        {"chapter_link_dropbox": "https:\/\/cdn.test\/ch1.mp3"}
    ];</script>"#;
    h.transport.respond(page, 200, body);
    h.transport.respond("https://cdn.test/ch1.mp3", 200, b"AUDIO");

    let summary = h.scheduler.run(&[StreamLocator::new(page)]).await;

    assert_eq!(summary.downloaded(), 1);
    let output = h.output_dir.join("book - chapter 1.mp3");
    assert_eq!(tokio::fs::read(&output).await.unwrap(), b"AUDIO");
}

#[tokio::test]
async fn summary_preserves_input_order() {
    let h = harness();
    let urls: Vec<String> = (1..=3)
        .map(|i| format!("https://host.test/stream/book/ch{}.m3u8", i))
        .collect();
    for (i, url) in urls.iter().enumerate() {
        let seg = format!("c{}s0.ts", i + 1);
        h.transport.respond(url, 200, &playlist(&[&seg]));
        h.transport.respond(&seg_url(&seg), 200, b"X");
    }

    let locators: Vec<StreamLocator> = urls.iter().map(|u| StreamLocator::new(u)).collect();
    let summary = h.scheduler.run(&locators).await;

    assert_eq!(summary.downloaded(), 3);
    for (i, report) in summary.chapters.iter().enumerate() {
        assert_eq!(report.number, i + 1);
        assert_eq!(report.locator, locators[i]);
    }
}
