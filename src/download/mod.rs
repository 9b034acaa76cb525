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


//! Chapter acquisition: segment fetching, assembly, scheduling, reporting

pub mod assembler;
pub mod fetcher;
pub mod ledger;
pub mod report;
pub mod scheduler;

pub use assembler::ChapterAssembler;
pub use fetcher::{RetryPolicy, Segment, SegmentFetcher, SegmentStatus};
pub use ledger::{LedgerEntry, RunLedger};
pub use report::{ChapterOutcome, ChapterReport, ChapterState, RunSummary};
pub use scheduler::{ChapterScheduler, SchedulerConfig};
