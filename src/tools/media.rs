use std::path::{Path, PathBuf};

use super::{TimeRange, ToolContext, ToolResponse};
use crate::error::{ErrorKind, ToolError};
use crate::utils::validate_and_normalize_url;

/// Selector used when the requested quality is not offered
pub const FALLBACK_SELECTOR: &str = "best";

const AUDIO_SELECTOR: &str = "bestaudio/best";
const AUDIO_FORMATS: &[&str] = &["best", "aac", "alac", "flac", "m4a", "mp3", "opus", "vorbis", "wav"];
const OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Parameters of a video download
#[derive(Debug, Clone, Default)]
pub struct VideoRequest {
    pub url: String,
    /// `best`, `worst` or a maximum height such as `720p`; `None` uses the configured default
    pub quality: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Parameters of an audio extraction
#[derive(Debug, Clone, Default)]
pub struct AudioRequest {
    pub url: String,
    /// Target codec (`mp3`, `m4a`, ...); `None` uses the configured default
    pub audio_format: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl VideoRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl AudioRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl ToolContext {
    /// Download a video, or a segment of it, into the download directory
    pub async fn download_video(&self, request: &VideoRequest) -> ToolResponse {
        self.respond("download_video", self.video_text(request)).await
    }

    /// Extract the audio track, or a segment of it, into the download directory
    pub async fn download_audio(&self, request: &AudioRequest) -> ToolResponse {
        self.respond("download_audio", self.audio_text(request)).await
    }

    async fn video_text(&self, request: &VideoRequest) -> Result<String, ToolError> {
        let url = validate_and_normalize_url(&request.url)?;
        let range = TimeRange::parse(request.start.as_deref(), request.end.as_deref())?;
        let quality = request
            .quality
            .clone()
            .unwrap_or_else(|| self.defaults.video_quality.clone());
        let selector = format_selector(&quality)?;
        let output_dir = self.prepare_output_dir(request.output_dir.as_deref())?;

        let path = self
            .download_media(&url, &output_dir, &selector, range, &[])
            .await?;

        let mut lines = vec![format!("Downloaded video: {}", path), format!("Quality: {}", quality)];
        if let Some(range) = range {
            lines.push(format!("Segment: {}", range.describe()));
        }
        Ok(lines.join("\n"))
    }

    async fn audio_text(&self, request: &AudioRequest) -> Result<String, ToolError> {
        let url = validate_and_normalize_url(&request.url)?;
        let range = TimeRange::parse(request.start.as_deref(), request.end.as_deref())?;
        let audio_format = audio_format(
            request
                .audio_format
                .as_deref()
                .unwrap_or(&self.defaults.audio_format),
        )?;
        let output_dir = self.prepare_output_dir(request.output_dir.as_deref())?;

        let extra = ["-x".to_string(), "--audio-format".to_string(), audio_format.clone()];
        let path = self
            .download_media(&url, &output_dir, AUDIO_SELECTOR, range, &extra)
            .await?;

        let mut lines = vec![format!("Downloaded audio: {}", path), format!("Format: {}", audio_format)];
        if let Some(range) = range {
            lines.push(format!("Segment: {}", range.describe()));
        }
        Ok(lines.join("\n"))
    }

    fn prepare_output_dir(&self, requested: Option<&Path>) -> Result<PathBuf, ToolError> {
        let dir = requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.download_dir.clone());
        fs_err::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Run a download under the retry policy. Within an attempt, an unavailable
    /// format is retried once with [`FALLBACK_SELECTOR`].
    async fn download_media(
        &self,
        url: &str,
        output_dir: &Path,
        selector: &str,
        range: Option<TimeRange>,
        extra: &[String],
    ) -> Result<String, ToolError> {
        let args = media_args(url, output_dir, selector, range, extra);
        let fallback_args = media_args(url, output_dir, FALLBACK_SELECTOR, range, extra);

        let runner = self.runner.as_ref();
        let (args, fallback_args) = (&args, &fallback_args);

        let output = self
            .retry
            .run(move || async move {
                match runner.run(args).await {
                    Err(err) if err.kind == ErrorKind::FormatUnavailable && args != fallback_args => {
                        tracing::warn!(
                            "Requested format unavailable, falling back to '{}'",
                            FALLBACK_SELECTOR
                        );
                        runner.run(fallback_args).await
                    }
                    result => result,
                }
            })
            .await?;

        Ok(downloaded_path(&output).unwrap_or_else(|| output_dir.display().to_string()))
    }
}

/// Translate a quality name into a yt-dlp format selector
pub fn format_selector(quality: &str) -> Result<String, ToolError> {
    let quality = quality.trim().to_lowercase();

    match quality.as_str() {
        "" | "best" => Ok("bestvideo+bestaudio/best".to_string()),
        "worst" => Ok("worstvideo+worstaudio/worst".to_string()),
        other => match other.trim_end_matches('p').parse::<u32>() {
            Ok(height) if height > 0 => Ok(format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                h = height
            )),
            _ => Err(ToolError::invalid_input(format!(
                "Unsupported quality '{}': use best, worst or a height such as 720p",
                other
            ))),
        },
    }
}

fn audio_format(requested: &str) -> Result<String, ToolError> {
    let format = requested.trim().to_lowercase();
    if AUDIO_FORMATS.contains(&format.as_str()) {
        Ok(format)
    } else {
        Err(ToolError::invalid_input(format!(
            "Unsupported audio format '{}': expected one of {}",
            requested,
            AUDIO_FORMATS.join(", ")
        )))
    }
}

fn media_args(
    url: &str,
    output_dir: &Path,
    selector: &str,
    range: Option<TimeRange>,
    extra: &[String],
) -> Vec<String> {
    let mut args = vec![
        "--no-playlist".to_string(),
        "-f".to_string(),
        selector.to_string(),
        "-o".to_string(),
        output_dir.join(OUTPUT_TEMPLATE).to_string_lossy().into_owned(),
        "--print".to_string(),
        "after_move:filepath".to_string(),
    ];

    if let Some(range) = range {
        args.push("--download-sections".to_string());
        args.push(range.to_section_arg());
        args.push("--force-keyframes-at-cuts".to_string());
    }

    args.extend(extra.iter().cloned());
    args.push(url.to_string());
    args
}

/// yt-dlp prints the final path last when run with `--print after_move:filepath`
fn downloaded_path(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(|line| line.to_string())
}
