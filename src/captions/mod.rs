//! Caption-track text extraction.
//!
//! Turns a WebVTT document produced by yt-dlp into plain text. Cue timing,
//! positioning lines, inline word timestamps and `<c>` styling tags are removed.
//! In plain mode adjacent repeated lines (common in auto-generated captions,
//! where each cue repeats the previous line) are collapsed; in timing mode
//! every cue is kept with a normalized `HH:MM:SS.mmm --> HH:MM:SS.mmm` header.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

use crate::utils::format_timestamp;

const WEBVTT_MARKER: &str = "WEBVTT";
const CUE_ARROW: &str = "-->";

static INLINE_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").unwrap());

static STYLE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?c>").unwrap());

static CUE_TIMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|\s)(\d{2}):(\d{2}):(\d{2})\.(\d{3}) --> (\d{2}):(\d{2}):(\d{2})\.(\d{3})(?:\s|$)",
    )
    .unwrap()
});

/// Caption file formats yt-dlp can write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionFormat {
    WebVtt,
    Srt,
    Ttml,
    Json3,
    Other(String),
}

impl CaptionFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "vtt" => CaptionFormat::WebVtt,
            "srt" => CaptionFormat::Srt,
            "ttml" => CaptionFormat::Ttml,
            "json3" => CaptionFormat::Json3,
            other => CaptionFormat::Other(other.to_string()),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            CaptionFormat::WebVtt => "vtt",
            CaptionFormat::Srt => "srt",
            CaptionFormat::Ttml => "ttml",
            CaptionFormat::Json3 => "json3",
            CaptionFormat::Other(ext) => ext,
        }
    }
}

/// Raw text of one caption track
#[derive(Debug, Clone)]
pub struct CaptionDocument {
    pub format: CaptionFormat,
    pub raw_text: String,
}

/// One unit of normalized output.
///
/// In plain mode `text` is a single line and the times are `None`. In timing
/// mode it holds every non-empty line of the cue and both times are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionLine {
    pub text: String,
    pub start: Option<Duration>,
    pub end: Option<Duration>,
}

impl CaptionLine {
    /// Render the line the way it appears in normalized output
    pub fn render(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => {
                let timing = format!("{} {} {}", format_timestamp(start), CUE_ARROW, format_timestamp(end));
                if self.text.is_empty() {
                    timing
                } else {
                    format!("{}\n{}", timing, self.text)
                }
            }
            _ => self.text.clone(),
        }
    }
}

impl CaptionDocument {
    pub fn new(format: CaptionFormat, raw_text: impl Into<String>) -> Self {
        Self {
            format,
            raw_text: raw_text.into(),
        }
    }

    /// Read a caption file, taking the format from its extension
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let raw_text = fs_err::read_to_string(path)?;
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(CaptionFormat::from_extension)
            .unwrap_or_else(|| CaptionFormat::Other(String::new()));

        Ok(Self { format, raw_text })
    }

    /// True when the first line carries the `WEBVTT` marker
    pub fn is_webvtt(&self) -> bool {
        !self.raw_text.trim().is_empty()
            && self
                .raw_text
                .lines()
                .next()
                .map(|line| line.contains(WEBVTT_MARKER))
                .unwrap_or(false)
    }

    /// Lazily walk the normalized lines. Each call starts from the beginning.
    pub fn lines(&self, preserve_timing: bool) -> CaptionLines<'_> {
        let lines: Vec<&str> = if self.is_webvtt() {
            self.raw_text.lines().collect()
        } else {
            Vec::new()
        };

        // Header ends at the first blank line that is directly followed by a cue
        let body_start = lines
            .windows(2)
            .position(|pair| pair[0].trim().is_empty() && pair[1].contains(CUE_ARROW))
            .map(|index| index + 1)
            .unwrap_or(lines.len());

        CaptionLines {
            lines,
            pos: body_start,
            preserve_timing,
            window: None,
            current_cue: None,
            last_emitted: None,
        }
    }

    /// Normalize the whole document into newline-joined text
    pub fn normalize(&self, preserve_timing: bool) -> String {
        join_lines(self.lines(preserve_timing))
    }
}

/// Normalize a caption document. Unrecognized or empty input yields `""`.
pub fn normalize(document: &CaptionDocument, preserve_timing: bool) -> String {
    document.normalize(preserve_timing)
}

pub(crate) fn join_lines(lines: impl Iterator<Item = CaptionLine>) -> String {
    lines.map(|line| line.render()).collect::<Vec<_>>().join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Timing,
    Styling,
    Blank,
    Content,
}

fn classify(line: &str) -> LineKind {
    if line.contains(CUE_ARROW) {
        LineKind::Timing
    } else if line.contains("align:") || line.contains("position:") {
        LineKind::Styling
    } else if line.trim().is_empty() {
        LineKind::Blank
    } else {
        LineKind::Content
    }
}

fn clean_content(line: &str) -> String {
    let without_timestamps = INLINE_TIMESTAMP.replace_all(line, "");
    STYLE_TAG.replace_all(&without_timestamps, "").trim().to_string()
}

fn parse_cue_timing(line: &str) -> Option<(Duration, Duration)> {
    let caps = CUE_TIMING.captures(line)?;
    let part = |index: usize| caps[index].parse::<u64>().ok();

    let start = timestamp_from_parts(part(1)?, part(2)?, part(3)?, part(4)?);
    let end = timestamp_from_parts(part(5)?, part(6)?, part(7)?, part(8)?);
    Some((start, end))
}

fn timestamp_from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Duration {
    Duration::from_secs(hours * 3600 + minutes * 60 + seconds) + Duration::from_millis(millis)
}

/// Iterator over the normalized lines of a [`CaptionDocument`].
#[derive(Debug, Clone)]
pub struct CaptionLines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    preserve_timing: bool,
    window: Option<(Duration, Option<Duration>)>,
    current_cue: Option<(Duration, Duration)>,
    last_emitted: Option<String>,
}

impl<'a> CaptionLines<'a> {
    /// Keep only cues overlapping `[start, end)`. An open end keeps everything after `start`.
    pub fn within(mut self, start: Duration, end: Option<Duration>) -> Self {
        self.window = Some((start, end));
        self
    }

    fn in_window(&self, cue: Option<(Duration, Duration)>) -> bool {
        match (self.window, cue) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((start, end)), Some((cue_start, cue_end))) => {
                cue_end > start && end.map(|end| cue_start < end).unwrap_or(true)
            }
        }
    }

    fn advance(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn next_plain(&mut self) -> Option<CaptionLine> {
        while let Some(raw) = self.advance() {
            match classify(raw) {
                LineKind::Timing => self.current_cue = parse_cue_timing(raw),
                LineKind::Content => {
                    if !self.in_window(self.current_cue) {
                        continue;
                    }
                    let text = clean_content(raw);
                    if text.is_empty() || self.last_emitted.as_deref() == Some(text.as_str()) {
                        continue;
                    }
                    self.last_emitted = Some(text.clone());
                    return Some(CaptionLine {
                        text,
                        start: None,
                        end: None,
                    });
                }
                LineKind::Styling | LineKind::Blank => {}
            }
        }
        None
    }

    fn next_cue(&mut self) -> Option<CaptionLine> {
        loop {
            let raw = self.advance()?;
            if classify(raw) != LineKind::Timing {
                // Content outside a well-formed cue belongs to a dropped timing line
                continue;
            }
            let Some(cue) = parse_cue_timing(raw) else {
                continue;
            };

            let mut texts = Vec::new();
            while let Some(next) = self.lines.get(self.pos) {
                match classify(next) {
                    LineKind::Timing => break,
                    LineKind::Content => {
                        let text = clean_content(next);
                        if !text.is_empty() {
                            texts.push(text);
                        }
                    }
                    LineKind::Styling | LineKind::Blank => {}
                }
                self.pos += 1;
            }

            if !self.in_window(Some(cue)) {
                continue;
            }

            return Some(CaptionLine {
                text: texts.join("\n"),
                start: Some(cue.0),
                end: Some(cue.1),
            });
        }
    }
}

impl<'a> Iterator for CaptionLines<'a> {
    type Item = CaptionLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.preserve_timing {
            self.next_cue()
        } else {
            self.next_plain()
        }
    }
}
