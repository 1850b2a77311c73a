use clap::{Parser, Subcommand};
use landing_kit::imaging::RustBackend;
use landing_kit::mode::BuildMode;
use landing_kit::pipeline::{self, PipelineEvent};
use landing_kit::split::{self, SplitRequest};
use landing_kit::{config, output};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "landing-kit")]
#[command(about = "Build tool for static landing-page sites")]
#[command(long_about = "\
Build tool for static landing-page sites

The site directory holds plain HTML, CSS, JS and images. landing-kit copies it
to the output directory, splicing tracking snippets into pages, minifying
stylesheets, converting images to WebP and zipping the result.

Site structure:

  site/
  ├── config.toml                  # Optional, see 'landing-kit gen-config'
  ├── index.html
  ├── privacy-policy.html          # Dropped with --no-privacy-policy
  ├── css/style.css                # Minified in production
  ├── images/pc/top/main.jpg       # Split with 'landing-kit split'
  └── snippets/
      ├── config.json              # Which pages get which snippet
      ├── head-ga.html             # head-* → <head>
      └── body-gtm.html            # anything else → <body>

Modes:
  build          production: minify, convert images, package
  build --dev    development: readable CSS with sourceURL trailers
  dev            development + serving: no image conversion, no archive")]
#[command(version = env!("LANDING_KIT_VERSION"))]
struct Cli {
    /// Site directory
    #[arg(long, default_value = "site", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (WebP cache)
    #[arg(long, default_value = ".landing-kit-temp", global = true)]
    temp_dir: PathBuf,

    /// Leave pages without tracking snippets
    #[arg(long, global = true)]
    no_snippets: bool,

    /// Leave privacy-policy pages and styles out of the output
    #[arg(long, global = true)]
    no_privacy_policy: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that convert images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Disable the WebP cache and re-encode every image
    #[arg(long)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory and package it
    Build {
        /// Development build: readable CSS with sourceURL trailers
        #[arg(long)]
        dev: bool,
        #[command(flatten)]
        cache: CacheArgs,
    },
    /// Fast development build for a local server: no conversion, no archive
    Dev {
        /// Minify as in production
        #[arg(long)]
        production: bool,
    },
    /// Show which snippets every page would get, without writing anything
    Check,
    /// Cut a tall image into strips and print the markup
    Split {
        /// Image under an images/ directory, e.g. site/images/pc/top/main.jpg
        image: PathBuf,
        /// Target width of the desktop image in pixels
        #[arg(long, conflicts_with = "scale")]
        width: Option<u32>,
        /// Resize factor of the desktop image
        #[arg(long)]
        scale: Option<f64>,
        /// Target width of the mobile image in pixels
        #[arg(long, conflicts_with = "sp_scale")]
        sp_width: Option<u32>,
        /// Resize factor of the mobile image
        #[arg(long)]
        sp_scale: Option<f64>,
        /// Media query of the mobile <source>
        #[arg(long)]
        media: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Build { dev, cache } => {
            let mut mode = base_mode(&cli);
            mode.set_development_mode(*dev);
            run_build(&cli, &mode, !cache.no_cache)?;
        }
        Command::Dev { production } => {
            let mut mode = base_mode(&cli);
            mode.set_development_mode(!*production).set_serving_mode(true);
            run_build(&cli, &mode, true)?;
        }
        Command::Check => {
            let report = pipeline::check(&cli.source, &cli.output, &cli.temp_dir, &base_mode(&cli))?;
            output::print_check_output(&report);
        }
        Command::Split {
            image,
            width,
            scale,
            sp_width,
            sp_scale,
            media,
        } => {
            let split_config = site_config(&cli.source)?.split;
            let request = SplitRequest {
                image: image.clone(),
                width: *width,
                scale: *scale,
                sp_width: *sp_width,
                sp_scale: *sp_scale,
                media: media.clone(),
            };
            let result = split::split(&RustBackend::new(), &request, &split_config)?;
            output::print_split_output(&result);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("landing_kit=debug")
        } else {
            EnvFilter::new("landing_kit=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Mode from the global switches; commands set development/serving.
fn base_mode(cli: &Cli) -> BuildMode {
    let mut mode = BuildMode::new();
    mode.set_snippets_mode(!cli.no_snippets)
        .set_privacy_policy_mode(!cli.no_privacy_policy);
    mode
}

/// Site config for commands that only need defaults when there is no site.
fn site_config(source: &Path) -> Result<config::SiteConfig, config::ConfigError> {
    if source.is_dir() {
        config::load_config(source)
    } else {
        Ok(config::SiteConfig::default())
    }
}

fn run_build(cli: &Cli, mode: &BuildMode, use_cache: bool) -> Result<(), Box<dyn std::error::Error>> {
    init_thread_pool(&site_config(&cli.source)?.processing);

    println!(
        "==> Building {} → {}",
        cli.source.display(),
        cli.output.display()
    );
    let (tx, rx) = mpsc::channel::<PipelineEvent>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = pipeline::build(
        &cli.source,
        &cli.output,
        &cli.temp_dir,
        mode,
        use_cache,
        Some(tx),
    );
    // The sender is dropped with `build`, so the printer drains and exits.
    if printer.join().is_err() {
        tracing::warn!("progress printer panicked");
    }
    let report = result?;
    output::print_build_summary(&report);
    println!("==> Build complete: {}", cli.output.display());
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
