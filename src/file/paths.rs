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


//! Deterministic path generation
//!
//! Everything the pipeline writes is named from the chapter's 1-based
//! number and the sanitized book title, so a re-run computes the same paths
//! and idempotence checks can be a plain existence test.
//!
//! Layout:
//! - final output: `{output_dir}/{title} - chapter {n}.{ext}`
//! - staging dir:  `{staging_root}/chapter_{nnn}/`
//! - segment file: `{iiiii}.ts` (zero-padded manifest index)
//! - merged blob:  `merged.ts` inside the staging dir

use std::path::{Path, PathBuf};

/// Merged intermediate filename inside a chapter's staging dir
pub const MERGED_FILE_NAME: &str = "merged.ts";

/// Replace characters that are invalid in filenames with `_`, trimming
/// surrounding whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    name.chars()
        .map(|c| if invalid_chars.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Final output path for one chapter, e.g. `book - chapter 1.mp3`
pub fn chapter_output_path(
    output_dir: &Path,
    book_title: &str,
    number: usize,
    extension: &str,
) -> PathBuf {
    output_dir.join(format!(
        "{} - chapter {}.{}",
        sanitize_filename(book_title),
        number,
        extension
    ))
}

/// Staging directory for one chapter, e.g. `chapter_003`
pub fn chapter_staging_dir(staging_root: &Path, number: usize) -> PathBuf {
    staging_root.join(format!("chapter_{:03}", number))
}

/// Staged segment filename for a manifest index, e.g. `00042.ts`.
/// Deterministic, so a re-fetch of the same index overwrites rather than
/// accumulates.
pub fn segment_file_name(index: u32) -> String {
    format!("{:05}.ts", index)
}
