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


//! Run orchestration
//!
//! [`ChapterScheduler::run`] drives every requested chapter through
//! resolve → fetch → assemble → transcode with two concurrency bounds:
//! an outer semaphore over chapters in flight and, inside each chapter,
//! an inner semaphore over segment fetches. The nested limits multiply:
//! total in-flight requests never exceed `chapters × segments`.
//!
//! Failure isolation: one chapter's failure never aborts its siblings.
//! Inside a failed chapter the remaining segment tasks drain rather than
//! being force-cancelled — queued fetches observe the failure flag after
//! acquiring their permit and finish without touching the network.
//!
//! `run` itself never fails; every chapter ends in the summary as Done,
//! Skipped or Failed, in input order.

use crate::audio::Transcoder;
use crate::download::assembler::ChapterAssembler;
use crate::download::fetcher::{RetryPolicy, Segment, SegmentFetcher, SegmentStatus};
use crate::download::ledger::RunLedger;
use crate::download::report::{ChapterOutcome, ChapterReport, ChapterState, RunSummary};
use crate::error::{PipelineError, Result};
use crate::file::paths;
use crate::manifest::{ManifestResolver, SegmentManifest, StreamLocator};
use crate::session::Session;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Book title; becomes the stem of every output filename
    pub book_title: String,

    /// Directory receiving the final per-chapter outputs
    pub output_dir: PathBuf,

    /// Root under which per-chapter staging directories are created
    pub staging_root: PathBuf,

    /// Chapters processed concurrently
    pub max_concurrent_chapters: usize,

    /// Segment fetches in flight per chapter
    pub max_concurrent_segments: usize,

    /// Retry policy applied to every segment fetch
    pub retry: RetryPolicy,

    /// Optional pause after each segment fetch, for hosts that throttle
    /// burst traffic
    pub segment_pacing: Option<Duration>,

    /// Base URL for relative track-list manifest links
    pub media_base: Option<String>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            book_title: "audiobook".to_string(),
            output_dir: PathBuf::from("downloads"),
            staging_root: PathBuf::from("downloads/staging"),
            max_concurrent_chapters: 10,
            max_concurrent_segments: 16,
            retry: RetryPolicy::default(),
            segment_pacing: None,
            media_base: None,
        }
    }
}

/// Tracks one chapter's position in the state machine
#[derive(Debug)]
struct ChapterJob {
    number: usize,
    state: ChapterState,
}

impl ChapterJob {
    fn new(number: usize) -> Self {
        Self {
            number,
            state: ChapterState::NotStarted,
        }
    }

    fn set_state(&mut self, state: ChapterState) {
        debug!(chapter = self.number, from = %self.state, to = %state, "chapter state");
        self.state = state;
    }
}

/// Drives a whole run of chapters to completion
pub struct ChapterScheduler {
    config: SchedulerConfig,
    resolver: ManifestResolver,
    fetcher: SegmentFetcher,
    assembler: ChapterAssembler,
    ledger: Arc<RunLedger>,
}

impl ChapterScheduler {
    pub fn new(
        config: SchedulerConfig,
        transport: Arc<dyn Transport>,
        session: Session,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let session = Arc::new(session);
        let mut resolver = ManifestResolver::new(transport.clone(), session.clone());
        if let Some(base) = &config.media_base {
            resolver = resolver.with_media_base(base.clone());
        }
        let fetcher =
            SegmentFetcher::new(transport, session).with_retry_policy(config.retry);
        let assembler = ChapterAssembler::new(transcoder);

        Self {
            config,
            resolver,
            fetcher,
            assembler,
            ledger: Arc::new(RunLedger::new()),
        }
    }

    /// Completion ledger for this scheduler's runs
    pub fn ledger(&self) -> Arc<RunLedger> {
        self.ledger.clone()
    }

    /// Process every locator to a terminal outcome.
    ///
    /// Chapter numbers come from the 1-based position in `locators`; the
    /// summary lists outcomes in the same order.
    pub async fn run(&self, locators: &[StreamLocator]) -> RunSummary {
        let mut summary = RunSummary::default();

        if let Err(e) = self.prepare_directories().await {
            error!(error = %e, "could not create working directories");
            let reason = e.to_string();
            for (i, locator) in locators.iter().enumerate() {
                summary.push(ChapterReport {
                    number: i + 1,
                    locator: locator.clone(),
                    outcome: ChapterOutcome::Failed {
                        reason: reason.clone(),
                    },
                });
            }
            return summary;
        }

        let chapter_permits = Arc::new(Semaphore::new(self.config.max_concurrent_chapters));
        let extension = self.assembler.output_extension().to_string();

        enum Slot {
            Ready(ChapterOutcome),
            Running(JoinHandle<ChapterOutcome>),
        }

        let mut slots: Vec<(usize, StreamLocator, Slot)> = Vec::with_capacity(locators.len());

        for (i, locator) in locators.iter().enumerate() {
            let number = i + 1;
            let output_path = paths::chapter_output_path(
                &self.config.output_dir,
                &self.config.book_title,
                number,
                &extension,
            );

            // Idempotence check: skip only when the output is actually on
            // disk. A ledger hit alone is not enough — the file may have
            // been removed since it completed, and then the chapter must
            // be downloaded again.
            if output_path.exists() {
                if !self.ledger.is_done(&output_path).await {
                    self.ledger.mark_done(&output_path).await;
                }
                info!(chapter = number, output = %output_path.display(), "output exists; skipping");
                slots.push((
                    number,
                    locator.clone(),
                    Slot::Ready(ChapterOutcome::Skipped {
                        output: output_path,
                    }),
                ));
                continue;
            }

            let ctx = ChapterContext {
                number,
                locator: locator.clone(),
                output_path,
                staging_dir: paths::chapter_staging_dir(&self.config.staging_root, number),
                resolver: self.resolver.clone(),
                fetcher: self.fetcher.clone(),
                assembler: self.assembler.clone(),
                ledger: self.ledger.clone(),
                segment_permits: self.config.max_concurrent_segments,
                pacing: self.config.segment_pacing,
            };
            let permits = chapter_permits.clone();

            slots.push((
                number,
                locator.clone(),
                Slot::Running(tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.unwrap();
                    run_chapter(ctx).await
                })),
            ));
        }

        for (number, locator, slot) in slots {
            let outcome = match slot {
                Slot::Ready(outcome) => outcome,
                Slot::Running(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => ChapterOutcome::Failed {
                        reason: format!("chapter task panicked: {}", e),
                    },
                },
            };
            summary.push(ChapterReport {
                number,
                locator,
                outcome,
            });
        }

        info!(%summary, "run finished");
        summary
    }

    async fn prepare_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        tokio::fs::create_dir_all(&self.config.staging_root).await?;
        Ok(())
    }
}

/// Everything one chapter task owns
struct ChapterContext {
    number: usize,
    locator: StreamLocator,
    output_path: PathBuf,
    staging_dir: PathBuf,
    resolver: ManifestResolver,
    fetcher: SegmentFetcher,
    assembler: ChapterAssembler,
    ledger: Arc<RunLedger>,
    segment_permits: usize,
    pacing: Option<Duration>,
}

async fn run_chapter(ctx: ChapterContext) -> ChapterOutcome {
    let number = ctx.number;
    let output = ctx.output_path.clone();
    match run_chapter_inner(ctx).await {
        Ok(()) => ChapterOutcome::Done { output },
        Err(e) => {
            error!(chapter = number, error = %e, "chapter failed");
            ChapterOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

async fn run_chapter_inner(ctx: ChapterContext) -> Result<()> {
    let mut job = ChapterJob::new(ctx.number);

    job.set_state(ChapterState::Resolving);
    let manifest = ctx.resolver.resolve(&ctx.locator).await?;
    info!(
        chapter = ctx.number,
        segments = manifest.len(),
        "manifest resolved"
    );

    tokio::fs::create_dir_all(&ctx.staging_dir).await?;

    job.set_state(ChapterState::Fetching);
    let segments = fetch_segments(&ctx, &manifest).await?;

    job.set_state(ChapterState::Assembling);
    let merged = ctx
        .assembler
        .merge(ctx.number, &segments, &ctx.staging_dir)
        .await?;

    job.set_state(ChapterState::Transcoding);
    ctx.assembler
        .transcode_and_finish(ctx.number, &merged, &ctx.staging_dir, &ctx.output_path)
        .await?;

    ctx.ledger.mark_done(&ctx.output_path).await;
    job.set_state(ChapterState::Done);
    Ok(())
}

/// Fan the manifest's segments out under the inner semaphore and fan them
/// all back in before returning.
///
/// The barrier is unconditional: even when a segment fails, every sibling
/// task reaches a terminal state before this returns, so no fetch is ever
/// left dangling into assembly. On failure the first error wins.
async fn fetch_segments(
    ctx: &ChapterContext,
    manifest: &SegmentManifest,
) -> Result<Vec<Segment>> {
    let permits = Arc::new(Semaphore::new(ctx.segment_permits));
    let failed = Arc::new(AtomicBool::new(false));
    let mut tasks: JoinSet<Result<Segment>> = JoinSet::new();

    for entry in &manifest.entries {
        let url = manifest.segment_url(entry);
        let index = entry.index;
        let chapter = ctx.number;
        let staging_dir = ctx.staging_dir.clone();
        let fetcher = ctx.fetcher.clone();
        let permits = permits.clone();
        let failed = failed.clone();
        let pacing = ctx.pacing;

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.unwrap();

            // Drain, don't cancel: once a sibling has failed, queued
            // fetches end as Failed without network traffic.
            if failed.load(Ordering::SeqCst) {
                return Ok(Segment::abandoned(chapter, index, &staging_dir));
            }

            let result = fetcher.fetch(chapter, index, &url, &staging_dir).await;
            if result.is_err() {
                failed.store(true, Ordering::SeqCst);
            }
            if let Some(delay) = pacing {
                tokio::time::sleep(delay).await;
            }
            result
        });
    }

    let mut segments = Vec::with_capacity(manifest.len());
    let mut first_error: Option<PipelineError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(segment)) => segments.push(segment),
            Ok(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(PipelineError::InvalidState(format!(
                        "segment task panicked: {}",
                        e
                    )));
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    if let Some(abandoned) = segments
        .iter()
        .find(|s| s.status != SegmentStatus::Downloaded)
    {
        // Shouldn't happen: abandonment implies a sibling error above.
        return Err(PipelineError::InvalidState(format!(
            "segment {} of chapter {} ended {:?} without a recorded error",
            abandoned.index, ctx.number, abandoned.status
        )));
    }

    segments.sort_by_key(|s| s.index);
    Ok(segments)
}
