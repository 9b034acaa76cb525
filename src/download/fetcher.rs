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


//! Per-segment download with bounded retry
//!
//! One fetch = one whole segment; there is no byte-range resume at this
//! granularity. Transient failures (timeouts, connection drops, 5xx
//! statuses) consume a small retry budget with a fixed delay between
//! attempts; non-transient errors such as 4xx statuses fail immediately.
//! Either way the segment ends `Failed` and the error propagates — a
//! missing segment corrupts playback order, so it is never skipped.
//!
//! Payloads land in the chapter's staging directory under a name derived
//! from the manifest index, so a re-fetch overwrites instead of
//! accumulating.

use crate::error::{PipelineError, Result};
use crate::file::paths;
use crate::session::Session;
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentStatus {
    /// Scheduled, not yet started
    Pending,
    /// Fetch in flight
    Downloading,
    /// Payload staged on disk
    Downloaded,
    /// Retry budget exhausted, or abandoned after the chapter failed
    Failed,
}

/// One downloaded unit of a chapter's media stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Owning chapter number, 1-based
    pub chapter: usize,
    /// Position in manifest order
    pub index: u32,
    /// On-disk staging location of the payload
    pub staging_path: PathBuf,
    /// Payload length recorded at fetch time
    pub bytes: u64,
    pub status: SegmentStatus,
}

impl Segment {
    /// Placeholder for a segment that was never fetched because its
    /// chapter had already failed.
    pub fn abandoned(chapter: usize, index: u32, staging_dir: &Path) -> Self {
        Self {
            chapter,
            index,
            staging_path: staging_dir.join(paths::segment_file_name(index)),
            bytes: 0,
            status: SegmentStatus::Failed,
        }
    }
}

/// Retry policy for segment fetches: a fixed small number of retries with
/// a short fixed delay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (2 retries = 3 total attempts)
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(500),
        }
    }
}

/// Downloads single segments into a chapter's staging area
#[derive(Clone)]
pub struct SegmentFetcher {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    retry: RetryPolicy,
}

impl SegmentFetcher {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self {
            transport,
            session,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch one segment and stage it on disk.
    ///
    /// Returns the `Downloaded` segment on success. A zero-length payload
    /// is surfaced as a warning but still counts as downloaded — some
    /// hosts serve empty-but-complete segments.
    pub async fn fetch(
        &self,
        chapter: usize,
        index: u32,
        url: &str,
        staging_dir: &Path,
    ) -> Result<Segment> {
        let staging_path = staging_dir.join(paths::segment_file_name(index));
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.try_fetch(url).await {
                Ok(body) => {
                    tokio::fs::write(&staging_path, &body).await?;
                    if body.is_empty() {
                        warn!(chapter, index, url, "segment downloaded but is empty");
                    }
                    debug!(chapter, index, bytes = body.len(), "segment downloaded");
                    return Ok(Segment {
                        chapter,
                        index,
                        staging_path,
                        bytes: body.len() as u64,
                        status: SegmentStatus::Downloaded,
                    });
                }
                Err(e) => {
                    if !e.is_transient() || attempts > self.retry.max_retries {
                        return Err(PipelineError::SegmentFetchFailed {
                            chapter,
                            index,
                            attempts,
                            reason: e.to_string(),
                        });
                    }
                    warn!(chapter, index, attempts, error = %e, "segment fetch failed; retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.transport.get(url, self.session.headers()).await?;
        if !response.is_success() {
            return Err(PipelineError::UnexpectedStatusCode {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }
}
