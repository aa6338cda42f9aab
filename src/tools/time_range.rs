use std::time::Duration;

use crate::error::ToolError;
use crate::utils::{format_timestamp, parse_timestamp};

/// A requested segment. `end == None` means "until the end of the video".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Duration,
    pub end: Option<Duration>,
}

impl TimeRange {
    /// Build a range from optional start/end strings. `Ok(None)` when neither is given.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>, ToolError> {
        if start.is_none() && end.is_none() {
            return Ok(None);
        }

        let start = start.map(parse_timestamp).transpose()?.unwrap_or_default();
        let end = end.map(parse_timestamp).transpose()?;

        if let Some(end) = end {
            if end <= start {
                return Err(ToolError::invalid_input(format!(
                    "End time {} must be after start time {}",
                    format_timestamp(end),
                    format_timestamp(start)
                )));
            }
        }

        Ok(Some(Self { start, end }))
    }

    /// Value for yt-dlp's `--download-sections`
    pub fn to_section_arg(&self) -> String {
        let end = self
            .end
            .map(|end| format!("{:.3}", end.as_secs_f64()))
            .unwrap_or_else(|| "inf".to_string());

        format!("*{:.3}-{}", self.start.as_secs_f64(), end)
    }

    pub fn describe(&self) -> String {
        match self.end {
            Some(end) => format!("{} - {}", format_timestamp(self.start), format_timestamp(end)),
            None => format!("{} - end", format_timestamp(self.start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_no_bounds() {
        assert_eq!(TimeRange::parse(None, None).unwrap(), None);
    }

    #[test]
    fn test_parse_bounds() {
        let range = TimeRange::parse(Some("1:00"), Some("1:30.5")).unwrap().unwrap();
        assert_eq!(range.start, Duration::from_secs(60));
        assert_eq!(range.end, Some(Duration::from_millis(90_500)));
        assert_eq!(range.to_section_arg(), "*60.000-90.500");
        assert_eq!(range.describe(), "00:01:00.000 - 00:01:30.500");
    }

    #[test]
    fn test_open_ranges() {
        let range = TimeRange::parse(Some("10"), None).unwrap().unwrap();
        assert_eq!(range.to_section_arg(), "*10.000-inf");
        assert_eq!(range.describe(), "00:00:10.000 - end");

        let range = TimeRange::parse(None, Some("5")).unwrap().unwrap();
        assert_eq!(range.start, Duration::ZERO);
    }

    #[test]
    fn test_end_before_start_is_invalid() {
        let err = TimeRange::parse(Some("00:02:00"), Some("00:01:00")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);

        assert!(TimeRange::parse(Some("5"), Some("5")).is_err());
        assert!(TimeRange::parse(Some("soon"), None).is_err());
    }
}
