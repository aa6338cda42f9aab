//! Tool handlers.
//!
//! Every public handler on [`ToolContext`] returns a [`ToolResponse`]; failures
//! are folded into the response instead of being returned as errors.

use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::{Config, DownloadsConfig};
use crate::error::{ErrorKind, ToolError};
use crate::retry::RetryPolicy;
use crate::utils::{format_count, format_duration, format_upload_date, truncate_chars, validate_and_normalize_url};
use crate::ytdlp::{fetch_video_info, CommandRunner, VideoInfo, YtDlp};

pub mod media;
pub mod subtitles;
pub mod time_range;

pub use media::{AudioRequest, VideoRequest};
pub use subtitles::SubtitleRequest;
pub use time_range::TimeRange;

const DESCRIPTION_PREVIEW_CHARS: usize = 1000;

/// Outcome of a tool call as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            error_kind: None,
        }
    }

    pub fn failure(err: &ToolError) -> Self {
        Self {
            success: false,
            text: format!("Error ({}): {}", err.kind, err.message),
            error_kind: Some(err.kind),
        }
    }
}

/// Everything a handler needs: the yt-dlp runner, the optional metadata cache,
/// the retry policy and download defaults.
pub struct ToolContext {
    runner: Box<dyn CommandRunner>,
    cache: Option<TtlCache>,
    retry: RetryPolicy,
    download_dir: PathBuf,
    defaults: DownloadsConfig,
}

impl ToolContext {
    pub fn new(runner: Box<dyn CommandRunner>, retry: RetryPolicy, download_dir: PathBuf) -> Self {
        Self {
            runner,
            cache: None,
            retry,
            download_dir,
            defaults: DownloadsConfig::default(),
        }
    }

    /// Build the context used by the CLI from loaded configuration
    pub fn from_config(config: &Config, cache: Option<TtlCache>) -> Self {
        Self {
            runner: Box::new(YtDlp::new(config.ytdlp.binary.clone())),
            cache,
            retry: config.retry_policy(),
            download_dir: config.download_dir(),
            defaults: config.downloads.clone(),
        }
    }

    pub fn with_cache(mut self, cache: TtlCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&TtlCache> {
        self.cache.as_ref()
    }

    /// Run a handler body inside a request span and fold its result into a response
    async fn respond<F>(&self, tool: &'static str, body: F) -> ToolResponse
    where
        F: Future<Output = Result<String, ToolError>>,
    {
        let span = tracing::info_span!("tool", tool, request_id = %Uuid::new_v4());

        async move {
            tracing::info!("Tool call started");
            match body.await {
                Ok(text) => {
                    tracing::info!("Tool call succeeded");
                    ToolResponse::success(text)
                }
                Err(err) => {
                    tracing::warn!(kind = %err.kind, "Tool call failed: {}", err.message);
                    ToolResponse::failure(&err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run yt-dlp under the retry policy
    pub(crate) async fn run_ytdlp(&self, args: &[String]) -> Result<String, ToolError> {
        let runner = self.runner.as_ref();
        self.retry.run(move || runner.run(args)).await
    }

    /// Metadata for `url`, served from the cache when possible
    pub(crate) async fn metadata(&self, url: &str) -> Result<VideoInfo, ToolError> {
        let key = format!("info:{}", url);

        if let Some(info) = self.cache.as_ref().and_then(|cache| cache.get::<VideoInfo>(&key)) {
            return Ok(info);
        }

        let runner = self.runner.as_ref();
        let info = self.retry.run(move || fetch_video_info(runner, url)).await?;

        if let Some(cache) = &self.cache {
            cache.set(&key, &info);
        }

        Ok(info)
    }

    /// Summarize a video's metadata
    pub async fn video_info(&self, url: &str) -> ToolResponse {
        self.respond("video_info", async {
            let url = validate_and_normalize_url(url)?;
            let info = self.metadata(&url).await?;
            Ok::<_, ToolError>(format_video_info(&info))
        })
        .await
    }

    /// List uploaded and automatic subtitle languages
    pub async fn list_subtitles(&self, url: &str) -> ToolResponse {
        self.respond("list_subtitles", async {
            let url = validate_and_normalize_url(url)?;
            let info = self.metadata(&url).await?;
            Ok::<_, ToolError>(format_subtitle_listing(&info))
        })
        .await
    }
}

fn format_video_info(info: &VideoInfo) -> String {
    let mut lines = vec![format!("Title: {}", info.title)];

    if let Some(url) = &info.webpage_url {
        lines.push(format!("URL: {}", url));
    }
    if let Some(duration) = info.duration {
        lines.push(format!("Duration: {}", format_duration(duration)));
    }
    if let Some(uploader) = &info.uploader {
        lines.push(format!("Uploader: {}", uploader));
    }
    if let Some(date) = &info.upload_date {
        lines.push(format!("Upload date: {}", format_upload_date(date)));
    }
    if let Some(views) = info.view_count {
        lines.push(format!("Views: {}", format_count(views)));
    }
    if let Some(channel) = &info.channel_url {
        lines.push(format!("Channel: {}", channel));
    }
    if let Some(thumbnail) = &info.thumbnail {
        lines.push(format!("Thumbnail: {}", thumbnail));
    }

    lines.push(format!("Formats: {} available", info.formats.len()));
    lines.push(format!("Subtitles: {}", language_list(&info.subtitles)));
    lines.push(format!(
        "Automatic captions: {} language{}",
        info.automatic_captions.len(),
        if info.automatic_captions.len() == 1 { "" } else { "s" }
    ));

    if let Some(description) = info.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        lines.push(String::new());
        lines.push("Description:".to_string());
        lines.push(truncate_chars(description, DESCRIPTION_PREVIEW_CHARS));
    }

    lines.join("\n")
}

fn format_subtitle_listing(info: &VideoInfo) -> String {
    let mut lines = vec![
        format!("Subtitle tracks for: {}", info.title),
        format!(
            "Manual subtitles ({}): {}",
            info.subtitles.len(),
            language_list(&info.subtitles)
        ),
        format!(
            "Automatic captions ({}): {}",
            info.automatic_captions.len(),
            language_list(&info.automatic_captions)
        ),
    ];

    if info.subtitles.is_empty() && info.automatic_captions.is_empty() {
        lines.push("No subtitle tracks are available for this video.".to_string());
    }

    lines.join("\n")
}

fn language_list(languages: &[String]) -> String {
    if languages.is_empty() {
        "none".to_string()
    } else {
        languages.join(", ")
    }
}
