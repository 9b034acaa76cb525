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


//! Manifest resolution
//!
//! `resolve(locator)` fetches the manifest document and parses it into a
//! [`SegmentManifest`]. No retry happens at this layer: a resolution
//! failure is chapter-fatal and surfaces to the scheduler as
//! `ManifestUnavailable` (transport / non-success status) or
//! `ManifestMalformed` (unrecognized document).

use crate::error::{PipelineError, Result};
use crate::manifest::{playlist, tracks, SegmentManifest, StreamLocator};
use crate::session::Session;
use crate::transport::Transport;
use std::sync::Arc;
use url::Url;

/// Resolves a stream locator into a segment manifest
#[derive(Clone)]
pub struct ManifestResolver {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    /// Base URL prepended to relative track-list links. Playlist manifests
    /// derive their base from the locator instead.
    media_base: Option<String>,
}

impl ManifestResolver {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self {
            transport,
            session,
            media_base: None,
        }
    }

    /// Set the media base URL for relative track-list links
    pub fn with_media_base<S: Into<String>>(mut self, base: S) -> Self {
        self.media_base = Some(base.into());
        self
    }

    /// Fetch and parse the manifest behind `locator`.
    pub async fn resolve(&self, locator: &StreamLocator) -> Result<SegmentManifest> {
        let response = self
            .transport
            .get(locator.as_str(), self.session.headers())
            .await
            .map_err(|e| PipelineError::manifest_unavailable(locator.as_str(), e.to_string()))?;

        if !response.is_success() {
            return Err(PipelineError::manifest_unavailable(
                locator.as_str(),
                format!("status {}", response.status),
            ));
        }

        let body = String::from_utf8_lossy(&response.body);

        if playlist::looks_like(&body) {
            let uris = playlist::parse(&body)?;
            let base = directory_of(locator.as_str())?;
            return Ok(SegmentManifest::new(base, uris));
        }

        if tracks::looks_like(&body) {
            let links = tracks::parse(&body)?;
            let base = self.media_base.clone().unwrap_or_default();
            if base.is_empty() && links.iter().any(|l| !l.starts_with("http")) {
                return Err(PipelineError::ManifestMalformed(
                    "track list has relative links but no media base URL is configured"
                        .to_string(),
                ));
            }
            return Ok(SegmentManifest::new(base, links));
        }

        Err(PipelineError::ManifestMalformed(
            "document is neither a media playlist nor an embedded track list".to_string(),
        ))
    }
}

/// Locator URL with its final path segment removed, trailing slash kept,
/// so `base + relative_uri` yields a fetchable segment address.
fn directory_of(locator: &str) -> Result<String> {
    let url = Url::parse(locator)?;
    let dir = url.join(".")?;
    Ok(dir.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_strips_manifest_name() {
        assert_eq!(
            directory_of("https://tokybook.com/stream/book/chapter-01.m3u8").unwrap(),
            "https://tokybook.com/stream/book/"
        );
    }

    #[test]
    fn directory_keeps_query_free_base() {
        assert_eq!(
            directory_of("https://tokybook.com/stream/book/ch.m3u8?tok=1").unwrap(),
            "https://tokybook.com/stream/book/"
        );
    }

    #[test]
    fn directory_rejects_non_url_locator() {
        assert!(directory_of("not a url").is_err());
    }
}
