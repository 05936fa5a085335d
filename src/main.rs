use clap::{Parser, Subcommand};
use quire::config::{self, SiteConfig};
use quire::imaging::RustBackend;
use quire::output;
use quire::paths::SitePaths;
use quire::serve::{self, LiveReload};
use quire::site::{BuildError, Site};
use quire::types::BuildMode;
use quire::watch::{self, Coordinator};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static site generator for Markdown page trees")]
#[command(long_about = "\
Static site generator for Markdown page trees

Your filesystem is the data source. Directories become folders with a list of
their pages, Markdown files become pages, and config documents cascade down
the tree.

Project structure:

  site/
  ├── config.yaml                  # Site config (sitename, site_url, rss_feeds, ...)
  ├── template.html                # Site-wide template (<%= content %> marks the body)
  ├── layouts/post.html            # Layouts wrap page bodies
  ├── partials/nav.md              # Fragments, included with {{ partial: nav }}
  ├── data/team.yaml               # Structured data, available as {{ team.lead }}
  ├── css/ js/ images/             # Assets (images are re-encoded as WebP)
  └── pages/
      ├── index.md                 # Home page → /
      ├── about.md                 # → /about (top level = in nav)
      └── blog/
          ├── config.yaml          # page_size: 5, date_sort_order: desc
          └── first-post.md        # → /blog/first-post

Run 'quire gen-config' to print a documented config.yaml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the output directory
    Build {
        /// Include drafts and future-dated pages
        #[arg(long)]
        drafts: bool,
    },
    /// Build, then rebuild on every change and serve with live reload
    Watch {
        /// Port for the development server (defaults to serve_port)
        #[arg(long)]
        port: Option<u16>,
        /// Rebuild on change without starting the server
        #[arg(long)]
        no_serve: bool,
    },
    /// Construct the page tree and print it without writing output
    Check,
    /// Print a stock config.yaml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let output_dir = if cli.output.is_absolute() {
        cli.output.clone()
    } else {
        cli.root.join(&cli.output)
    };
    let paths = SitePaths::new(&cli.root, output_dir);

    match cli.command {
        Command::Build { drafts } => {
            let mode = if drafts { BuildMode::Preview } else { BuildMode::Production };
            let site = Site::new(paths, mode, RustBackend::new());
            init_thread_pool(&site.config());
            let report = site.build()?;
            output::print_build_report(&report, &site.paths().output);
        }
        Command::Watch { port, no_serve } => {
            let site = Site::new(paths.clone(), BuildMode::Preview, RustBackend::new());
            let config = site.config();
            init_thread_pool(&config);
            match site.build() {
                Ok(report) => output::print_build_report(&report, &paths.output),
                Err(e @ BuildError::UnsafeOutput { .. }) => return Err(e.into()),
                Err(e) => tracing::error!(error = %e, "Initial build failed"),
            }

            let reload = Arc::new(LiveReload::new());
            if !no_serve {
                let server = serve::bind(port.unwrap_or(config.serve_port))?;
                let root = paths.output.clone();
                let reload = Arc::clone(&reload);
                std::thread::spawn(move || serve::serve(server, root, reload));
            }

            let mut coordinator = Coordinator::new(paths, site, reload);
            watch::run(&mut coordinator, Duration::from_millis(config.watcher_delay))?;
        }
        Command::Check => {
            let site = Site::new(paths, BuildMode::Production, RustBackend::new());
            init_thread_pool(&site.config());
            let tree = site.tree();
            output::print_tree(&tree, &site.paths().root);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_yaml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool from `max_processes`, capped at the CPU count.
fn init_thread_pool(config: &SiteConfig) {
    let threads = config::effective_threads(config);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
