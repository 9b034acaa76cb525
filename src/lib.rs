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


//! ChapterFetch — segmented audiobook chapter downloader
//!
//! Turns a list of per-chapter stream locators into finished audio files:
//! each chapter's manifest is resolved into an ordered segment list, the
//! segments are fetched concurrently under nested limits, reassembled in
//! manifest order, transcoded to MP3 via ffmpeg, and the staging artifacts
//! removed. Re-runs are idempotent — chapters whose output already exists
//! are skipped without network traffic — and one chapter's failure never
//! aborts the rest of the run.
//!
//! Typical use:
//!
//! ```no_run
//! use chapterfetch::audio::FfmpegTranscoder;
//! use chapterfetch::download::{ChapterScheduler, SchedulerConfig};
//! use chapterfetch::manifest::StreamLocator;
//! use chapterfetch::session::{Session, SessionConfig, DEFAULT_REQUEST_TIMEOUT};
//! use chapterfetch::transport::HttpTransport;
//! use std::sync::Arc;
//!
//! # async fn run() -> chapterfetch::Result<()> {
//! let session = Session::new(SessionConfig::default());
//! let transport = Arc::new(HttpTransport::new(DEFAULT_REQUEST_TIMEOUT)?);
//! let transcoder = Arc::new(FfmpegTranscoder::new("ffmpeg"));
//!
//! let scheduler = ChapterScheduler::new(
//!     SchedulerConfig {
//!         book_title: "My Book".into(),
//!         ..SchedulerConfig::default()
//!     },
//!     transport,
//!     session,
//!     transcoder,
//! );
//!
//! let locators = vec![StreamLocator::new("https://example.com/ch1.m3u8")];
//! let summary = scheduler.run(&locators).await;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod download;
pub mod error;
pub mod file;
pub mod manifest;
pub mod session;
pub mod transport;

pub use download::{ChapterOutcome, ChapterScheduler, RunSummary, SchedulerConfig};
pub use error::{PipelineError, Result};
pub use manifest::{SegmentManifest, StreamLocator};
pub use session::{Session, SessionConfig};
