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


//! External transcoder invocation
//!
//! The assembler hands the merged chapter blob to a [`Transcoder`]; the
//! pipeline contract only requires a working transcode step, so the codec
//! and container live entirely behind this trait. [`FfmpegTranscoder`]
//! shells out to ffmpeg for MPEG-TS → MP3:
//!
//! `ffmpeg -i merged.ts -codec:a libmp3lame -q:a 2 -id3v2_version 3 -vn -y out.mp3`
//!
//! Quality levels for VBR (`-q:a`): 0 ≈ 245 kbps, 2 ≈ 190 kbps (default),
//! 4 ≈ 165 kbps, 6 ≈ 130 kbps.

use crate::error::{PipelineError, Result};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Bitrate options for lossy encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bitrate {
    /// Constant bitrate in kbps
    Cbr(u32),
    /// Variable bitrate with quality (0-9 for MP3, lower is better)
    Vbr(u8),
}

impl Default for Bitrate {
    fn default() -> Self {
        Self::Vbr(2) // High quality VBR
    }
}

/// Synchronous external transcode step: `(merged input, output) -> ()`,
/// exit code 0 required for success.
pub trait Transcoder: Send + Sync {
    fn transcode<'a>(&'a self, input: &'a Path, output: &'a Path) -> BoxFuture<'a, Result<()>>;

    /// File extension the transcoder produces, without the dot
    fn output_extension(&self) -> &str;
}

/// ffmpeg-backed MP3 transcoder
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
    bitrate: Bitrate,
}

impl FfmpegTranscoder {
    pub fn new<P: Into<PathBuf>>(ffmpeg_path: P) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            bitrate: Bitrate::default(),
        }
    }

    pub fn with_bitrate(mut self, bitrate: Bitrate) -> Self {
        self.bitrate = bitrate;
        self
    }

    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-codec:a".to_string(),
            "libmp3lame".to_string(),
        ];

        match self.bitrate {
            Bitrate::Vbr(quality) => {
                args.push("-q:a".to_string());
                args.push(quality.to_string());
            }
            Bitrate::Cbr(kbps) => {
                args.push("-b:a".to_string());
                args.push(format!("{}k", kbps));
            }
        }

        // ID3v2.3 for better player compatibility
        args.push("-id3v2_version".to_string());
        args.push("3".to_string());

        // No video streams
        args.push("-vn".to_string());

        // Re-runs overwrite a half-written output rather than stalling on
        // ffmpeg's interactive prompt
        args.push("-y".to_string());

        args.push(output.to_string_lossy().to_string());
        args
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<()> {
        let args = self.build_args(input, output);

        let status = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PipelineError::TranscoderNotFound
                } else {
                    PipelineError::TranscodeFailed(format!("failed to execute ffmpeg: {}", e))
                }
            })?;

        if !status.success() {
            return Err(PipelineError::TranscodeFailed(format!(
                "ffmpeg exited with status: {}",
                status
            )));
        }

        Ok(())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode<'a>(&'a self, input: &'a Path, output: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(self.run(input, output))
    }

    fn output_extension(&self) -> &str {
        "mp3"
    }
}
