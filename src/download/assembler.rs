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


//! Chapter assembly
//!
//! Takes a chapter's fully staged segments, concatenates them in manifest
//! order into one `merged.ts` blob, hands that to the transcoder, then
//! removes the staging directory.
//!
//! Invariants enforced here:
//! - merge only starts once every segment is `Downloaded` and its staged
//!   file length matches the length recorded at fetch time
//! - cleanup happens only after a successful transcode; on failure all
//!   staged artifacts are retained for inspection
//! - a cleanup error is logged and never changes the chapter's outcome

use crate::audio::Transcoder;
use crate::download::fetcher::{Segment, SegmentStatus};
use crate::error::{PipelineError, Result};
use crate::file::paths::MERGED_FILE_NAME;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

/// Merges staged segments and drives the transcode + cleanup tail of a
/// chapter's pipeline.
#[derive(Clone)]
pub struct ChapterAssembler {
    transcoder: Arc<dyn Transcoder>,
}

impl ChapterAssembler {
    pub fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }

    /// Extension of the final output files, without the dot
    pub fn output_extension(&self) -> &str {
        self.transcoder.output_extension()
    }

    /// Full assembly: merge, transcode, clean up.
    pub async fn assemble(
        &self,
        chapter: usize,
        segments: &[Segment],
        staging_dir: &Path,
        output_path: &Path,
    ) -> Result<PathBuf> {
        let merged = self.merge(chapter, segments, staging_dir).await?;
        self.transcode_and_finish(chapter, &merged, staging_dir, output_path)
            .await?;
        Ok(output_path.to_path_buf())
    }

    /// Concatenate staged segments in ascending manifest index into the
    /// merged intermediate. Fails without touching the output if any
    /// segment is not `Downloaded` or its staged length disagrees with the
    /// length recorded at fetch time.
    pub async fn merge(
        &self,
        chapter: usize,
        segments: &[Segment],
        staging_dir: &Path,
    ) -> Result<PathBuf> {
        for segment in segments {
            if segment.status != SegmentStatus::Downloaded {
                return Err(PipelineError::InvalidState(format!(
                    "segment {} of chapter {} is {:?}, not Downloaded",
                    segment.index, chapter, segment.status
                )));
            }
            let staged_len = tokio::fs::metadata(&segment.staging_path).await?.len();
            if staged_len != segment.bytes {
                return Err(PipelineError::InvalidState(format!(
                    "segment {} of chapter {} staged as {} bytes, expected {}",
                    segment.index, chapter, staged_len, segment.bytes
                )));
            }
        }

        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.index);

        let merged_path = staging_dir.join(MERGED_FILE_NAME);
        let file = tokio::fs::File::create(&merged_path).await?;
        let mut writer = BufWriter::new(file);
        for segment in &ordered {
            let bytes = tokio::fs::read(&segment.staging_path).await?;
            writer.write_all(&bytes).await?;
        }
        writer.flush().await?;

        debug!(chapter, segments = ordered.len(), "segments merged");
        Ok(merged_path)
    }

    /// Transcode the merged blob into the final output, then remove the
    /// staging directory. Staged files are retained if the transcode fails.
    pub async fn transcode_and_finish(
        &self,
        chapter: usize,
        merged: &Path,
        staging_dir: &Path,
        output_path: &Path,
    ) -> Result<()> {
        self.transcoder.transcode(merged, output_path).await?;
        info!(chapter, output = %output_path.display(), "chapter transcoded");

        if let Err(e) = tokio::fs::remove_dir_all(staging_dir).await {
            let err = PipelineError::CleanupFailed(format!(
                "could not remove {}: {}",
                staging_dir.display(),
                e
            ));
            warn!(chapter, error = %err, "staging cleanup failed");
        }
        Ok(())
    }
}
