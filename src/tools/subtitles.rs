use std::path::{Path, PathBuf};

use super::{TimeRange, ToolContext, ToolResponse};
use crate::captions::{join_lines, CaptionDocument, CaptionFormat};
use crate::error::ToolError;
use crate::utils::validate_and_normalize_url;

const DEFAULT_SUBTITLE_FORMAT: &str = "vtt";

/// Parameters of a subtitle download
#[derive(Debug, Clone, Default)]
pub struct SubtitleRequest {
    pub url: String,
    /// Language codes; empty means the configured defaults
    pub languages: Vec<String>,
    /// Subtitle format to request from yt-dlp; empty means `vtt`
    pub format: String,
    /// Fetch automatic captions instead of uploaded subtitles
    pub auto_generated: bool,
    /// Keep cue timings in the output
    pub preserve_timing: bool,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl SubtitleRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// One caption file written by yt-dlp
#[derive(Debug)]
struct SubtitleTrack {
    language: String,
    document: CaptionDocument,
}

impl ToolContext {
    /// Download caption tracks and return their text, one section per track
    pub async fn download_subtitles(&self, request: &SubtitleRequest) -> ToolResponse {
        self.respond("download_subtitles", self.subtitle_text(request)).await
    }

    async fn subtitle_text(&self, request: &SubtitleRequest) -> Result<String, ToolError> {
        let url = validate_and_normalize_url(&request.url)?;
        let range = TimeRange::parse(request.start.as_deref(), request.end.as_deref())?;
        let languages = self.subtitle_languages(&request.languages)?;
        let format = subtitle_format(&request.format)?;

        // Removed on drop, whichever way this function returns
        let work_dir = tempfile::Builder::new()
            .prefix("ytscribe-subs-")
            .tempdir()?;

        let args = subtitle_args(&url, &languages, &format, request.auto_generated, work_dir.path());
        self.run_ytdlp(&args).await?;

        let tracks = collect_tracks(work_dir.path())?;
        let source = if request.auto_generated { "automatic captions" } else { "subtitles" };
        if tracks.is_empty() {
            return Err(ToolError::captions_unavailable(format!(
                "No {} found for language(s): {}",
                source,
                languages.join(", ")
            )));
        }

        let sections: Vec<String> = tracks
            .iter()
            .filter_map(|track| {
                let text = render_track(track, request.preserve_timing, range);
                if text.is_empty() {
                    tracing::debug!("Track {} produced no text", track.language);
                    return None;
                }
                Some(format!(
                    "=== {} ({}) ===\n{}",
                    track.language,
                    track.document.format.extension(),
                    text
                ))
            })
            .collect();

        if sections.is_empty() {
            let scope = range
                .map(|range| format!(" between {}", range.describe()))
                .unwrap_or_default();
            return Err(ToolError::captions_unavailable(format!(
                "Downloaded {} contained no text{}",
                source, scope
            )));
        }

        tracing::info!("Extracted {} subtitle track(s)", sections.len());
        Ok(sections.join("\n\n"))
    }

    fn subtitle_languages(&self, requested: &[String]) -> Result<Vec<String>, ToolError> {
        let source: &[String] = if requested.is_empty() {
            &self.defaults.subtitle_languages
        } else {
            requested
        };

        let languages: Vec<String> = source
            .iter()
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
            .collect();

        if languages.is_empty() {
            return Err(ToolError::invalid_input("At least one subtitle language is required"));
        }
        if let Some(bad) = languages.iter().find(|lang| lang.contains(',')) {
            return Err(ToolError::invalid_input(format!("Invalid language code: {}", bad)));
        }

        Ok(languages)
    }
}

fn subtitle_format(requested: &str) -> Result<String, ToolError> {
    let format = requested.trim().to_lowercase();
    if format.is_empty() {
        return Ok(DEFAULT_SUBTITLE_FORMAT.to_string());
    }
    if !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ToolError::invalid_input(format!("Invalid subtitle format: {}", requested)));
    }
    Ok(format)
}

fn subtitle_args(url: &str, languages: &[String], format: &str, auto_generated: bool, work_dir: &Path) -> Vec<String> {
    let template = work_dir.join("%(id)s.%(ext)s");

    vec![
        "--skip-download".to_string(),
        "--no-playlist".to_string(),
        if auto_generated { "--write-auto-subs" } else { "--write-subs" }.to_string(),
        "--sub-langs".to_string(),
        languages.join(","),
        "--sub-format".to_string(),
        format.to_string(),
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
        url.to_string(),
    ]
}

fn collect_tracks(dir: &Path) -> Result<Vec<SubtitleTrack>, ToolError> {
    let mut paths: Vec<PathBuf> = fs_err::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            Ok::<_, ToolError>(SubtitleTrack {
                language: track_language(path),
                document: CaptionDocument::from_file(path)?,
            })
        })
        .collect()
}

/// yt-dlp names caption files `<id>.<lang>.<ext>`
fn track_language(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit_once('.'))
        .map(|(_, lang)| lang.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// WebVTT tracks are normalized; any other format is passed through as-is
fn render_track(track: &SubtitleTrack, preserve_timing: bool, range: Option<TimeRange>) -> String {
    match track.document.format {
        CaptionFormat::WebVtt => {
            let lines = track.document.lines(preserve_timing);
            match range {
                Some(range) => join_lines(lines.within(range.start, range.end)),
                None => join_lines(lines),
            }
        }
        _ => track.document.raw_text.trim().to_string(),
    }
}
