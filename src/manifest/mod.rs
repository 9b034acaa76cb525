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


//! Stream locators and segment manifests
//!
//! A [`StreamLocator`] points at one chapter's manifest document. Resolving
//! it yields a [`SegmentManifest`]: an ordered list of segment URIs plus the
//! base URL that turns relative entries into fetchable addresses. Manifest
//! order is authoritative — reassembly preserves it regardless of download
//! completion order.
//!
//! Two manifest formats are recognized:
//! - HLS-style media playlists ([`playlist`]): `#`-prefixed tag/comment
//!   lines, segment URIs on the remaining lines.
//! - Embedded script track lists ([`tracks`]): a `tracks = [ ... ]` JSON
//!   array inside page script text, parsed strictly — never evaluated.

pub mod playlist;
pub mod resolver;
pub mod tracks;

pub use resolver::ManifestResolver;

use serde::{Deserialize, Serialize};

/// Opaque reference to where a chapter's manifest lives.
///
/// Position in the input list is the canonical chapter ordering; the
/// chapter's output filename is derived from its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamLocator(String);

impl StreamLocator {
    pub fn new<S: Into<String>>(locator: S) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamLocator {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One `(index, uri)` entry of a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEntry {
    /// Position in manifest order, 0-based
    pub index: u32,
    /// Segment address, relative to the manifest base URL or absolute
    pub uri: String,
}

/// Ordered segment list for exactly one chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentManifest {
    /// Base URL for resolving relative entries; empty when every entry is
    /// absolute
    pub base_url: String,
    pub entries: Vec<SegmentEntry>,
}

impl SegmentManifest {
    /// Build a manifest from URIs in authoritative order
    pub fn new<S: Into<String>>(base_url: S, uris: Vec<String>) -> Self {
        Self {
            base_url: base_url.into(),
            entries: uris
                .into_iter()
                .enumerate()
                .map(|(i, uri)| SegmentEntry { index: i as u32, uri })
                .collect(),
        }
    }

    /// Absolute address of one entry. Entries already given as absolute
    /// URIs pass through unchanged.
    pub fn segment_url(&self, entry: &SegmentEntry) -> String {
        if entry.uri.starts_with("http://") || entry.uri.starts_with("https://") {
            entry.uri.clone()
        } else {
            format!("{}{}", self.base_url, entry.uri)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
