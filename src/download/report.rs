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


//! Run reporting
//!
//! Per-chapter outcomes and the end-of-run summary. A failed chapter never
//! aborts the run; its outcome carries the reason so the summary can name
//! every failing chapter at the end.

use crate::manifest::StreamLocator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Chapter pipeline states, in order of progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterState {
    NotStarted,
    Resolving,
    Fetching,
    Assembling,
    Transcoding,
    Done,
    Failed,
}

impl ChapterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Assembling => "assembling",
            Self::Transcoding => "transcoding",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Terminal outcome of one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChapterOutcome {
    /// Downloaded, assembled and transcoded during this run
    Done { output: PathBuf },
    /// Output already existed; no network traffic spent
    Skipped { output: PathBuf },
    /// Chapter abandoned; reason names the first error encountered
    Failed { reason: String },
}

/// One chapter's entry in the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterReport {
    /// 1-based chapter number
    pub number: usize,
    pub locator: StreamLocator,
    pub outcome: ChapterOutcome,
}

/// End-of-run summary over all requested chapters, in input order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub chapters: Vec<ChapterReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: ChapterReport) {
        self.chapters.push(report);
    }

    pub fn downloaded(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| matches!(c.outcome, ChapterOutcome::Done { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| matches!(c.outcome, ChapterOutcome::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.chapters
            .iter()
            .filter(|c| matches!(c.outcome, ChapterOutcome::Failed { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChapterReport> {
        self.chapters
            .iter()
            .filter(|c| matches!(c.outcome, ChapterOutcome::Failed { .. }))
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} downloaded, {} skipped, {} failed",
            self.downloaded(),
            self.skipped(),
            self.failed()
        )?;
        for report in self.failures() {
            if let ChapterOutcome::Failed { reason } = &report.outcome {
                write!(f, "\n  chapter {}: {}", report.number, reason)?;
            }
        }
        Ok(())
    }
}
