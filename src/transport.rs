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


//! HTTP transport seam
//!
//! Network GETs are the only blocking operations in the pipeline, so they
//! sit behind the [`Transport`] trait: the resolver and fetcher take an
//! `Arc<dyn Transport>`, production wires in [`HttpTransport`] over
//! `reqwest`, and tests script responses without a network.
//!
//! Status handling: any response that arrives is returned with its status
//! code for the caller to judge; only transport-level failures (timeout,
//! connect error, mid-body drop) become `Err`, classified transient so the
//! fetcher's retry loop can act on them.

use crate::error::{PipelineError, Result};
use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// One fetched response: status plus fully-read body
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// 2xx check
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstract GET with custom headers
pub trait Transport: Send + Sync {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<TransportResponse>>;
}

/// `reqwest`-backed transport with a per-request timeout and streamed body
/// read.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn get_inner(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<TransportResponse> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();

        // Stream the body in chunks; a drop mid-body is a transient
        // transport failure, not a partial success.
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify)?;
            body.extend_from_slice(&chunk);
        }

        Ok(TransportResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a HashMap<String, String>,
    ) -> BoxFuture<'a, Result<TransportResponse>> {
        Box::pin(self.get_inner(url, headers))
    }
}

/// Map a reqwest error to the pipeline taxonomy, marking timeouts,
/// connect failures and body drops transient.
fn classify(e: reqwest::Error) -> PipelineError {
    let transient = e.is_timeout() || e.is_connect() || e.is_body() || e.is_request();
    PipelineError::network(e.to_string(), transient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        let ok = TransportResponse {
            status: 206,
            body: vec![],
        };
        let not_found = TransportResponse {
            status: 404,
            body: vec![],
        };
        assert!(ok.is_success());
        assert!(!not_found.is_success());
    }
}
