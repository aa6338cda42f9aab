use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytscribe::cli::{CacheCommands, Cli, Commands, SubtitleCommands};
use ytscribe::config::Config;
use ytscribe::output;
use ytscribe::tools::{AudioRequest, SubtitleRequest, ToolContext, ToolResponse, VideoRequest};
use ytscribe::{utils, TtlCache};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for tool output
    let default_filter = if cli.verbose { "ytscribe=debug" } else { "ytscribe=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref()).await?;

    let response = match cli.command {
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::config_path()?,
                };
                println!("Configuration file: {}", path.display());
                println!("Use --show to print the current settings.");
            }
            return Ok(());
        }
        Commands::Cache { command } => {
            let cache = TtlCache::new(config.cache_dir())?;
            let text = match command {
                CacheCommands::Clear => format!("Removed {} cache entries", cache.clear()),
                CacheCommands::Cleanup => format!("Removed {} expired cache entries", cache.cleanup()),
            };
            ToolResponse::success(text)
        }
        command => {
            // Check for required external dependencies (non-fatal)
            let missing_deps = utils::check_dependencies(&config.ytdlp.binary).await;
            if !missing_deps.is_empty() && !cli.quiet {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
            }

            let context = ToolContext::from_config(&config, open_cache(&config));
            run_tool(&context, command, cli.quiet).await
        }
    };

    match &cli.output {
        Some(path) => {
            output::save_to_file(&response, path, &cli.format)?;
            println!("Result saved to: {}", path.display());
        }
        None => output::print_to_console(&response, &cli.format)?,
    }

    if !response.success {
        std::process::exit(1);
    }

    Ok(())
}

/// Open the metadata cache and drop stale entries left by earlier runs
fn open_cache(config: &Config) -> Option<TtlCache> {
    if !config.cache.enabled {
        return None;
    }

    match TtlCache::new(config.cache_dir()) {
        Ok(cache) => {
            cache.cleanup();
            Some(cache.with_default_ttl(config.cache_ttl()))
        }
        Err(e) => {
            tracing::warn!("Metadata cache disabled: {:#}", e);
            None
        }
    }
}

async fn run_tool(context: &ToolContext, command: Commands, quiet: bool) -> ToolResponse {
    match command {
        Commands::Info { url } => with_spinner("Fetching video info...", quiet, context.video_info(&url)).await,
        Commands::Subtitles { command } => match command {
            SubtitleCommands::List { url } => {
                with_spinner("Listing subtitles...", quiet, context.list_subtitles(&url)).await
            }
            SubtitleCommands::Get {
                url,
                languages,
                sub_format,
                auto,
                timestamps,
                start,
                end,
            } => {
                let request = SubtitleRequest {
                    url,
                    languages,
                    format: sub_format,
                    auto_generated: auto,
                    preserve_timing: timestamps,
                    start,
                    end,
                };
                with_spinner("Downloading subtitles...", quiet, context.download_subtitles(&request)).await
            }
        },
        Commands::Video {
            url,
            quality,
            start,
            end,
            output_dir,
        } => {
            let request = VideoRequest {
                url,
                quality,
                start,
                end,
                output_dir,
            };
            with_spinner("Downloading video with yt-dlp...", quiet, context.download_video(&request)).await
        }
        Commands::Audio {
            url,
            audio_format,
            start,
            end,
            output_dir,
        } => {
            let request = AudioRequest {
                url,
                audio_format,
                start,
                end,
                output_dir,
            };
            with_spinner("Extracting audio with yt-dlp...", quiet, context.download_audio(&request)).await
        }
        Commands::Cache { .. } | Commands::Config { .. } => {
            unreachable!("handled before the tool context is built")
        }
    }
}

async fn with_spinner<F>(message: &'static str, quiet: bool, task: F) -> ToolResponse
where
    F: Future<Output = ToolResponse>,
{
    if quiet {
        return task.await;
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));

    let response = task.await;

    progress.finish_and_clear();
    response
}
