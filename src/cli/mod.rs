use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ytscribe",
    about = "ytscribe - Video metadata, clean subtitle text and media segments via yt-dlp",
    version,
    long_about = "Tools built on yt-dlp for fetching video metadata, listing and extracting readable subtitle text, and downloading time-bounded video or audio segments. Metadata lookups are cached on disk."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./ytscribe.yaml or the user config dir)
    #[arg(long, global = true, value_name = "FILE", env = "YTSCRIBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the result to a file instead of the console
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show metadata for a video
    Info {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// List or extract subtitles
    Subtitles {
        #[command(subcommand)]
        command: SubtitleCommands,
    },

    /// Download a video or a segment of it
    Video {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Quality: best, worst or a maximum height such as 720p
        #[arg(long, value_name = "QUALITY")]
        quality: Option<String>,

        /// Segment start (SS, MM:SS or HH:MM:SS)
        #[arg(long, value_name = "TIME")]
        start: Option<String>,

        /// Segment end (SS, MM:SS or HH:MM:SS)
        #[arg(long, value_name = "TIME")]
        end: Option<String>,

        /// Target directory (defaults to the configured download directory)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Extract audio from a video or a segment of it
    Audio {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Audio codec (mp3, m4a, opus, wav, flac, ...)
        #[arg(long, value_name = "CODEC")]
        audio_format: Option<String>,

        /// Segment start (SS, MM:SS or HH:MM:SS)
        #[arg(long, value_name = "TIME")]
        start: Option<String>,

        /// Segment end (SS, MM:SS or HH:MM:SS)
        #[arg(long, value_name = "TIME")]
        end: Option<String>,

        /// Target directory (defaults to the configured download directory)
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Maintain the metadata cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum SubtitleCommands {
    /// List available subtitle and automatic caption languages
    List {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Download subtitles and print their text
    Get {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Language codes (comma separated or repeated)
        #[arg(short, long = "lang", value_name = "LANG", value_delimiter = ',')]
        languages: Vec<String>,

        /// Subtitle format to request (vtt is cleaned, others are returned as-is)
        #[arg(long, value_name = "FORMAT", default_value = "vtt")]
        sub_format: String,

        /// Use automatic captions instead of uploaded subtitles
        #[arg(long)]
        auto: bool,

        /// Keep cue timings in the output
        #[arg(long)]
        timestamps: bool,

        /// Only include cues after this time
        #[arg(long, value_name = "TIME")]
        start: Option<String>,

        /// Only include cues before this time
        #[arg(long, value_name = "TIME")]
        end: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove every cache entry
    Clear,
    /// Remove expired and unreadable cache entries
    Cleanup,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON object with success flag and text
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subtitles_get() {
        let cli = Cli::parse_from([
            "ytscribe", "subtitles", "get", "https://youtu.be/x", "--lang", "en,de", "--auto", "--timestamps",
        ]);

        match cli.command {
            Commands::Subtitles {
                command:
                    SubtitleCommands::Get {
                        languages,
                        sub_format,
                        auto,
                        timestamps,
                        ..
                    },
            } => {
                assert_eq!(languages, vec!["en", "de"]);
                assert_eq!(sub_format, "vtt");
                assert!(auto);
                assert!(timestamps);
            }
            _ => panic!("expected subtitles get"),
        }
    }

    #[test]
    fn test_global_format_flag() {
        let cli = Cli::parse_from(["ytscribe", "info", "https://youtu.be/x", "--format", "json"]);
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
