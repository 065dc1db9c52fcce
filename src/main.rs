use clap::{Parser, Subcommand};
use html_srcset::cache::RenderCache;
use html_srcset::config::{self, BuildPaths, UserOptions};
use html_srcset::imaging::RustBackend;
use html_srcset::output::{self, BuildSummary};
use html_srcset::transform::SrcsetTransform;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory layout shared by every command.
#[derive(clap::Args, Clone)]
struct LayoutArgs {
    /// Project root; `srcset.toml` is read from here
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Directory (under root) holding the source images
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,

    /// Built site directory (under root) whose HTML is rewritten
    #[arg(long, default_value = "dist")]
    out_dir: PathBuf,

    /// Subdirectory of the output and URL segment for generated variants
    #[arg(long, default_value = "assets")]
    assets_dir: String,
}

impl LayoutArgs {
    fn paths(&self) -> BuildPaths {
        BuildPaths {
            root: self.root.clone(),
            public_dir: self.public_dir.clone(),
            out_dir: self.out_dir.clone(),
            assets_dir: self.assets_dir.clone(),
        }
    }
}

/// Command-line overrides layered on top of `srcset.toml`.
#[derive(clap::Args, Clone)]
struct OverrideArgs {
    /// Lossy encoding quality (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Prefix for generated filenames
    #[arg(long)]
    prefix: Option<String>,
}

impl OverrideArgs {
    fn as_options(&self) -> UserOptions {
        UserOptions {
            quality: self.quality,
            asset_name_prefix: self.prefix.clone(),
            ..Default::default()
        }
    }
}

#[derive(Parser)]
#[command(name = "html-srcset")]
#[command(about = "Generate responsive image variants and rewrite HTML to use them")]
#[command(long_about = "\
Generate responsive image variants and rewrite HTML to use them

Mark an image for expansion by appending ?srcset to its URL:

  <img src=\"/images/hero.jpg?srcset\" alt=\"Hero\">

The build command resizes public/images/hero.jpg to every configured width
and format, writes the variants to dist/assets/, and rewrites the element:

  <img src=\"/assets/hero-320w.jpeg\" alt=\"Hero\"
       srcset=\"/assets/hero-320w.jpeg 320w, /assets/hero-640w.jpeg 640w, ...\"
       sizes=\"(max-width: 768px) 100vw, (max-width: 1200px) 50vw, 33vw\">

<source srcset=\"...?srcset\"> inside <picture> is expanded too; its type
attribute picks the matching format.

Run 'html-srcset gen-config' to generate a documented srcset.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render variants and rewrite every HTML document in the output directory
    Build {
        #[command(flatten)]
        layout: LayoutArgs,
        #[command(flatten)]
        overrides: OverrideArgs,
        /// Disable the variant cache and re-encode every image
        #[arg(long)]
        no_cache: bool,
    },
    /// Validate srcset.toml and show the resolved options
    Check {
        #[command(flatten)]
        layout: LayoutArgs,
        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Print a stock srcset.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Build {
            layout,
            overrides,
            no_cache,
        } => {
            let options = load_user_options(&layout.root)?
                .merge(overrides.as_options())
                .resolve()?;
            init_thread_pool(&options.processing);

            let paths = layout.paths();
            let assets = paths.assets_output_dir();
            let cache = if no_cache {
                RenderCache::empty(&assets)
            } else {
                RenderCache::load(&assets)
            };

            let transform =
                SrcsetTransform::from_resolved(options, RustBackend::new()).with_cache(cache);
            transform.configure(paths.clone());

            let site = paths.output_dir();
            println!("==> Rewriting HTML in {}", site.display());
            let documents = find_documents(&site);

            let workers = config::effective_threads(&transform.options().processing);
            let reports = transform.rewrite_files(&documents, workers);

            for report in &reports {
                output::print_document_report(report);
            }

            let stats = transform.cache().map(|cache| {
                if let Err(e) = cache.save() {
                    tracing::warn!(
                        dir = %cache.dir().display(),
                        error = %e,
                        "could not save cache manifest"
                    );
                }
                cache.stats()
            });
            println!();
            output::print_build_summary(&BuildSummary::from_reports(&reports), stats.as_ref());
        }
        Command::Check { layout, overrides } => {
            println!("==> Checking {}", layout.root.join(config::CONFIG_FILENAME).display());
            let options = load_user_options(&layout.root)?
                .merge(overrides.as_options())
                .resolve()?;
            output::print_options(&options, &layout.paths());
            println!("==> Options are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default level.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("html_srcset=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}

fn load_user_options(root: &Path) -> Result<UserOptions, config::ConfigError> {
    Ok(config::load_raw_config(root)?.unwrap_or_default())
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

/// Every `.html` file under `site`, with its `/`-separated path relative to it.
fn find_documents(site: &Path) -> Vec<(PathBuf, String)> {
    let mut documents: Vec<(PathBuf, String)> = WalkDir::new(site)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        })
        .filter_map(|e| {
            let relative = e.path().strip_prefix(site).ok()?;
            let logical = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some((e.path().to_path_buf(), logical))
        })
        .collect();
    documents.sort_by(|a, b| a.1.cmp(&b.1));
    documents
}

