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


//! Embedded script track-list parsing
//!
//! Some hosts inline the chapter list in page script text as
//! `tracks = [ {...}, {...} ]` where each object carries a
//! `chapter_link_dropbox` address. The array body must be valid JSON;
//! it is parsed against that schema and never evaluated as script.
//! Anything else is a declared `ManifestMalformed` error.

use crate::error::{PipelineError, Result};
use serde::Deserialize;

const TRACKS_MARKER: &str = "tracks = [";

/// Quick format sniff used by the resolver before committing to a parse
pub fn looks_like(text: &str) -> bool {
    text.contains(TRACKS_MARKER)
}

/// One entry of the embedded track array. Unknown fields are ignored;
/// entries without a chapter link (e.g. intro stingers) are skipped.
#[derive(Debug, Deserialize)]
struct TrackEntry {
    #[serde(default)]
    chapter_link_dropbox: Option<String>,
}

/// Extract chapter links from embedded script text, in array order.
///
/// Escaped path separators (`\/`) are unescaped; everything else is
/// returned verbatim for the resolver to absolutize.
pub fn parse(text: &str) -> Result<Vec<String>> {
    let start = text.find(TRACKS_MARKER).ok_or_else(|| {
        PipelineError::ManifestMalformed("no `tracks = [` array in script text".to_string())
    })?;

    // Slice from the opening bracket to its closing one. The array never
    // nests, so the first `]` terminates it.
    let array = &text[start + TRACKS_MARKER.len() - 1..];
    let end = array.find(']').ok_or_else(|| {
        PipelineError::ManifestMalformed("unterminated tracks array".to_string())
    })?;

    let body = array[1..end].trim().trim_end_matches(',');
    let json = format!("[{}]", body);

    let entries: Vec<TrackEntry> = serde_json::from_str(&json).map_err(|e| {
        PipelineError::ManifestMalformed(format!("tracks array is not valid JSON: {}", e))
    })?;

    let links: Vec<String> = entries
        .into_iter()
        .filter_map(|t| t.chapter_link_dropbox)
        .map(|link| link.replace('\\', ""))
        .collect();

    if links.is_empty() {
        return Err(PipelineError::ManifestMalformed(
            "tracks array has no chapter links".to_string(),
        ));
    }

    Ok(links)
}
