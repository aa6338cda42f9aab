use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind as IoErrorKind;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{ErrorKind, ToolError};

/// Something that can run yt-dlp with a list of arguments and hand back stdout
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<String, ToolError>;
}

/// yt-dlp invoked as a subprocess
pub struct YtDlp {
    binary: String,
}

impl YtDlp {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl CommandRunner for YtDlp {
    async fn run(&self, args: &[String]) -> Result<String, ToolError> {
        tracing::debug!("Running {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == IoErrorKind::NotFound {
                    ToolError::new(
                        ErrorKind::ToolNotFound,
                        format!(
                            "{} is not available. Please install it: https://github.com/yt-dlp/yt-dlp",
                            self.binary
                        ),
                    )
                } else {
                    ToolError::unclassified(format!("Failed to run {}: {}", self.binary, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = ToolError::from_stderr(&stderr);
            tracing::debug!(kind = %err.kind, "yt-dlp failed: {}", stderr.trim());
            return Err(err);
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse the JSON object in yt-dlp output, ignoring warnings printed around it
pub fn extract_json(output: &str) -> Result<Value, ToolError> {
    let (Some(start), Some(end)) = (output.find('{'), output.rfind('}')) else {
        return Err(ToolError::unclassified("yt-dlp output did not contain JSON"));
    };
    if end < start {
        return Err(ToolError::unclassified("yt-dlp output did not contain JSON"));
    }

    serde_json::from_str(&output[start..=end])
        .map_err(|e| ToolError::unclassified(format!("Failed to parse yt-dlp JSON: {}", e)))
}

/// One downloadable format as listed by yt-dlp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSummary {
    pub format_id: String,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub note: Option<String>,
}

/// Metadata summary kept from yt-dlp's info dict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub id: Option<String>,
    pub title: String,
    /// Length of the video in seconds
    pub duration: Option<f64>,
    pub uploader: Option<String>,
    /// Upload date as `YYYYMMDD`
    pub upload_date: Option<String>,
    pub view_count: Option<u64>,
    pub description: Option<String>,
    pub formats: Vec<FormatSummary>,
    /// Languages with uploaded subtitles
    pub subtitles: Vec<String>,
    /// Languages with automatic captions
    pub automatic_captions: Vec<String>,
    pub thumbnail: Option<String>,
    pub channel_url: Option<String>,
    pub webpage_url: Option<String>,
}

impl VideoInfo {
    pub fn from_json(info: &Value) -> Self {
        let text = |field: &str| info[field].as_str().map(|s| s.to_string());
        let languages = |field: &str| {
            info[field]
                .as_object()
                .map(|tracks| tracks.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };

        let formats = info["formats"]
            .as_array()
            .map(|formats| {
                formats
                    .iter()
                    .filter_map(|format| {
                        Some(FormatSummary {
                            format_id: format["format_id"].as_str()?.to_string(),
                            ext: format["ext"].as_str().map(|s| s.to_string()),
                            resolution: format["resolution"].as_str().map(|s| s.to_string()),
                            note: format["format_note"].as_str().map(|s| s.to_string()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: text("id"),
            title: text("title").unwrap_or_else(|| "Untitled".to_string()),
            duration: info["duration"].as_f64(),
            uploader: text("uploader"),
            upload_date: text("upload_date"),
            view_count: info["view_count"].as_u64(),
            description: text("description"),
            formats,
            subtitles: languages("subtitles"),
            automatic_captions: languages("automatic_captions"),
            thumbnail: text("thumbnail"),
            channel_url: text("channel_url"),
            webpage_url: text("webpage_url"),
        }
    }
}

/// Arguments for a metadata-only lookup
pub fn info_args(url: &str) -> Vec<String> {
    ["--dump-json", "--no-playlist", "--skip-download", url]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Fetch and summarize metadata for `url`
pub async fn fetch_video_info(runner: &dyn CommandRunner, url: &str) -> Result<VideoInfo, ToolError> {
    let output = runner.run(&info_args(url)).await?;
    let info = extract_json(&output)?;
    Ok(VideoInfo::from_json(&info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_skips_warnings() {
        let output = "WARNING: [youtube] nsig extraction failed\n{\"title\": \"Clip\", \"nested\": {\"a\": 1}}\nWARNING: trailing\n";
        let value = extract_json(output).unwrap();
        assert_eq!(value["title"], "Clip");
        assert_eq!(value["nested"]["a"], 1);
    }

    #[test]
    fn test_extract_json_without_object() {
        assert_eq!(extract_json("no json here").unwrap_err().kind, ErrorKind::Unclassified);
        assert!(extract_json("} backwards {").is_err());
        assert!(extract_json("{ broken").is_err());
    }

    #[test]
    fn test_video_info_from_json() {
        let info = VideoInfo::from_json(&json!({
            "id": "abc123",
            "title": "A talk",
            "duration": 125.0,
            "uploader": "Someone",
            "upload_date": "20240131",
            "view_count": 1500,
            "formats": [
                {"format_id": "18", "ext": "mp4", "resolution": "640x360", "format_note": "360p"},
                {"ext": "mhtml"}
            ],
            "subtitles": {"en": [], "fr": []},
            "automatic_captions": {"de": [], "en": []},
            "channel_url": "https://www.youtube.com/channel/x"
        }));

        assert_eq!(info.id.as_deref(), Some("abc123"));
        assert_eq!(info.title, "A talk");
        assert_eq!(info.duration, Some(125.0));
        assert_eq!(info.view_count, Some(1500));
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].note.as_deref(), Some("360p"));
        assert_eq!(info.subtitles, vec!["en", "fr"]);
        assert_eq!(info.automatic_captions, vec!["de", "en"]);
        assert_eq!(info.thumbnail, None);
    }

    #[test]
    fn test_missing_title_defaults() {
        let info = VideoInfo::from_json(&json!({}));
        assert_eq!(info.title, "Untitled");
        assert!(info.formats.is_empty());
        assert!(info.subtitles.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_video_info_uses_dump_json() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|args| args.iter().any(|a| a == "--dump-json") && args.last().map(String::as_str) == Some("https://example.com/v"))
            .times(1)
            .returning(|_| Ok("{\"title\": \"From mock\"}".to_string()));

        let info = fetch_video_info(&runner, "https://example.com/v").await.unwrap();
        assert_eq!(info.title, "From mock");
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let runner = YtDlp::new("ytscribe-definitely-missing-binary");
        let err = runner.run(&["--version".to_string()]).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ToolNotFound);
        assert!(!err.retryable);
        assert!(crate::utils::check_dependencies("ytscribe-definitely-missing-binary")
            .await
            .iter()
            .any(|missing| missing.starts_with("ytscribe-definitely-missing-binary")));
    }
}
