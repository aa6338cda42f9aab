use std::time::Duration;
use url::Url;

use crate::error::ToolError;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String, ToolError> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| ToolError::invalid_input(format!("Invalid URL format: {}", url)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ToolError::invalid_input("URL must use HTTP or HTTPS protocol"));
    }

    Ok(parsed.to_string())
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format a cue timestamp as `HH:MM:SS.mmm`
pub fn format_timestamp(duration: Duration) -> String {
    let millis = duration.as_millis();
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis % 1000)
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS`, each optionally with a `.fff` fraction
pub fn parse_timestamp(input: &str) -> Result<Duration, ToolError> {
    let invalid = || {
        ToolError::invalid_input(format!(
            "Invalid timestamp '{}': expected SS, MM:SS or HH:MM:SS",
            input
        ))
    };

    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 || parts.iter().any(|part| part.is_empty()) {
        return Err(invalid());
    }

    let (whole, last) = parts.split_at(parts.len() - 1);
    let seconds: f64 = last[0].parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds < 0.0 || (!whole.is_empty() && seconds >= 60.0) {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    for (index, part) in whole.iter().enumerate() {
        if !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = part.parse().map_err(|_| invalid())?;
        // Minutes after an hour field must stay below 60
        if whole.len() == 2 && index == 1 && value >= 60 {
            return Err(invalid());
        }
        total = total * 60 + value;
    }

    Ok(Duration::from_secs(total * 60) + Duration::from_secs_f64(seconds))
}

/// Format a count with thousands separators
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut formatted = String::with_capacity(digits.len() + digits.len() / 3);

    for (index, c) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(c);
    }

    formatted
}

/// Turn yt-dlp's `YYYYMMDD` upload date into `YYYY-MM-DD`
pub fn format_upload_date(raw: &str) -> String {
    chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Truncate to at most `max_chars` characters, appending an ellipsis when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", text[..byte_index].trim_end()),
        None => text.to_string(),
    }
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_binary: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_binary, "--version").await {
        missing.push(format!("{} - required for every tool", yt_dlp_binary));
    }

    // ffmpeg is needed for segment cuts and audio extraction
    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - recommended for segment downloads and audio extraction".to_string());
    }

    missing
}

/// Check if a command is available in PATH by asking it for its version
pub async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(Duration::from_millis(0)), "00:00:00.000");
        assert_eq!(format_timestamp(Duration::from_millis(3_723_045)), "01:02:03.045");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_timestamp("1:30").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timestamp("01:02:03").unwrap(), Duration::from_secs(3723));
        assert_eq!(parse_timestamp("00:00:01.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_timestamp("90").unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        for input in ["", "abc", "1:2:3:4", "1:75", "1:60:00", "-5", "1::2", "a:10"] {
            let err = parse_timestamp(input).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidInput, "input {:?}", input);
        }
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_upload_date() {
        assert_eq!(format_upload_date("20240131"), "2024-01-31");
        assert_eq!(format_upload_date("unknown"), "unknown");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w...");
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("http://example.com").is_ok());
        assert_eq!(
            validate_and_normalize_url("ftp://example.com").unwrap_err().kind,
            ErrorKind::InvalidInput
        );
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }
}
