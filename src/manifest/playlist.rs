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


//! HLS-style media playlist parsing
//!
//! Recognized schema (a deliberate subset of an HLS media playlist — this
//! is not a protocol-compliant player):
//! - lines starting with `#` are tags/comments and carry no segment data;
//! - every other non-empty line naming a `.ts` resource is one segment URI,
//!   in playback order.
//!
//! A document with no segment line is a declared parse error, not a silent
//! empty chapter.

use crate::error::{PipelineError, Result};

/// Quick format sniff used by the resolver before committing to a parse
pub fn looks_like(text: &str) -> bool {
    text.starts_with("#EXTM3U") || text.lines().any(is_segment_line)
}

/// Extract segment URIs in playlist order.
///
/// Fails with `ManifestMalformed` when no segment line is present.
pub fn parse(text: &str) -> Result<Vec<String>> {
    let segments: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| is_segment_line(line))
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        return Err(PipelineError::ManifestMalformed(
            "playlist contains no media segment lines".to_string(),
        ));
    }

    Ok(segments)
}

fn is_segment_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#') && line.ends_with(".ts")
}
