//! ytscribe - yt-dlp backed tools for video metadata, subtitles and media segments
//!
//! The library provides the pieces the CLI is built from: a WebVTT caption
//! normalizer, a bounded retry policy over classified failures, a file-backed
//! TTL cache for metadata lookups, and the tool handlers that compose them.

pub mod cache;
pub mod captions;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod retry;
pub mod tools;
pub mod utils;
pub mod ytdlp;

pub use cache::{CacheEntry, TtlCache};
pub use captions::{normalize, CaptionDocument, CaptionFormat, CaptionLine};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use error::{ErrorKind, ToolError};
pub use retry::{with_retry, RetryPolicy};
pub use tools::{ToolContext, ToolResponse};
pub use ytdlp::{CommandRunner, VideoInfo, YtDlp};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
