use anyhow::Result;
use blogsmith::build::build_site;
use blogsmith::config::Config;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Builds a static blog from markdown posts and pages.
#[derive(Parser)]
#[command(name = "blogsmith", version, about, long_about = None)]
struct Cli {
    /// Directory to look for `site.yaml` in (then its parents)
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Write the site here instead of the configured output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), cli.verbose))
        .with_target(false)
        .init();

    let project = std::fs::canonicalize(&cli.project).unwrap_or(cli.project);
    let config = Config::from_directory(&project, cli.output.as_deref())?;
    let summary = build_site(&config)?;

    println!("Site built successfully!");
    println!("   - {} posts generated", summary.posts);
    println!("   - {} pages generated", summary.pages);
    println!("   - Output in: {}/", summary.output_directory.display());
    Ok(())
}

/// Honours `RUST_LOG` when it holds valid directives; otherwise logs at info,
/// or debug with `--verbose`.
fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(level))
}

#[cfg(test)]
mod test {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_rust_log_wins() {
        let filter = log_filter(Some("warn"), false);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
        let filter = log_filter(Some("error"), true);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_default_level() {
        assert_eq!(log_filter(None, false).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(log_filter(None, true).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some(" "), false).max_level_hint(), Some(LevelFilter::INFO));
    }
}
