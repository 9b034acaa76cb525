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


use anyhow::Context;
use chapterfetch::audio::{Bitrate, FfmpegTranscoder};
use chapterfetch::download::{ChapterScheduler, RetryPolicy, SchedulerConfig};
use chapterfetch::manifest::StreamLocator;
use chapterfetch::session::{Session, SessionConfig};
use chapterfetch::transport::HttpTransport;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chapterfetch")]
#[command(about = "Download segmented audiobook chapters and transcode them to MP3")]
struct Cli {
    /// Chapter manifest URLs, in chapter order
    #[arg(required_unless_present = "locators_file")]
    locators: Vec<String>,

    /// File with one manifest URL per line (alternative to positional URLs)
    #[arg(long, value_name = "FILE")]
    locators_file: Option<PathBuf>,

    /// Book title; used for output filenames
    #[arg(short = 't', long, default_value = "audiobook")]
    book_title: String,

    /// Directory for final chapter files
    #[arg(short, long, default_value = "downloads")]
    output_dir: PathBuf,

    /// Directory for intermediate segment files
    #[arg(long, default_value = "downloads/staging")]
    staging_dir: PathBuf,

    /// Referer header (player page URL)
    #[arg(long)]
    referer: Option<String>,

    /// Playback token header, if the host requires one
    #[arg(long)]
    playback_token: Option<String>,

    /// Audiobook id header, if the host requires one
    #[arg(long)]
    book_id: Option<String>,

    /// Explicit user agent; a pooled browser agent is used when absent
    #[arg(long)]
    user_agent: Option<String>,

    /// Base URL for relative track-list manifest links
    #[arg(long)]
    media_base: Option<String>,

    /// Chapters downloaded concurrently
    #[arg(long, default_value_t = 10)]
    chapter_jobs: usize,

    /// Segment fetches in flight per chapter
    #[arg(long, default_value_t = 16)]
    segment_jobs: usize,

    /// Retries per segment after the first attempt
    #[arg(long, default_value_t = 2)]
    retries: u32,

    /// Pause between segment fetches in milliseconds, for throttling hosts
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Path to the ffmpeg binary
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// MP3 VBR quality (0-9, lower is better)
    #[arg(long, default_value_t = 2)]
    quality: u8,
}

impl Cli {
    async fn collect_locators(&self) -> anyhow::Result<Vec<StreamLocator>> {
        if let Some(path) = &self.locators_file {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading locators from {}", path.display()))?;
            let locators: Vec<StreamLocator> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(StreamLocator::new)
                .collect();
            anyhow::ensure!(!locators.is_empty(), "{} contains no URLs", path.display());
            return Ok(locators);
        }
        Ok(self.locators.iter().map(StreamLocator::new).collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chapterfetch=info")),
        )
        .init();

    let cli = Cli::parse();
    let locators = cli.collect_locators().await?;

    let session = Session::new(SessionConfig {
        referer: cli.referer.clone().unwrap_or_default(),
        playback_token: cli.playback_token.clone(),
        book_id: cli.book_id.clone(),
        user_agent: cli.user_agent.clone(),
        ..SessionConfig::default()
    });
    let transport =
        Arc::new(HttpTransport::new(session.request_timeout()).context("building HTTP client")?);
    let transcoder =
        Arc::new(FfmpegTranscoder::new(&cli.ffmpeg).with_bitrate(Bitrate::Vbr(cli.quality)));

    let config = SchedulerConfig {
        book_title: cli.book_title.clone(),
        output_dir: cli.output_dir.clone(),
        staging_root: cli.staging_dir.clone(),
        max_concurrent_chapters: cli.chapter_jobs,
        max_concurrent_segments: cli.segment_jobs,
        retry: RetryPolicy {
            max_retries: cli.retries,
            ..RetryPolicy::default()
        },
        segment_pacing: cli.pacing_ms.map(Duration::from_millis),
        media_base: cli.media_base.clone(),
    };

    let scheduler = ChapterScheduler::new(config, transport, session, transcoder);
    let summary = scheduler.run(&locators).await;

    println!("{}", summary);
    anyhow::ensure!(
        summary.is_complete_success(),
        "{} chapter(s) failed",
        summary.failed()
    );
    Ok(())
}
