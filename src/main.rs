use clap::{Parser, Subcommand};
use springs_listings::bus::FilterBus;
use springs_listings::catalog::ListingKind;
use springs_listings::config::{self, CONFIG_FILENAME, ListingsConfig};
use springs_listings::filter::FilterSelector;
use springs_listings::output::{self, ListingSummary};
use springs_listings::shell::{Document, ListingPage};
use springs_listings::source::{RowAudit, audit_rows};
use springs_listings::store::MemoryStore;
use springs_listings::types::RecordId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

fn version_string() -> &'static str {
    let hash = env!("SPRINGS_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "springs-listings")]
#[command(about = "Filtered, paginated listings for Springs Magazine")]
#[command(long_about = "\
Filtered, paginated listings for Springs Magazine

Renders one page of a listing (articles, doctors, dentists, attorneys,
issues, category) from a JSON record store, with optional filter.

Store layout (fixtures/store.json by default):

  {
    \"articles\": [ { \"id\": 1, \"title\": ..., \"date\": \"2024-04-02\", ... } ],
    \"authors\":  [ { \"id\": 1, \"first_name\": ..., \"last_name\": ... } ],
    \"issues\":   [ { \"id\": 1, \"issue_title\": ..., \"start_date\": ... } ],
    \"profiles\": [ { \"id\": 1, \"first_name\": ..., \"type\": [\"doctor\"] } ]
  }

Set RUST_LOG to adjust logging (default: springs_listings=info).
Run 'springs-listings gen-config' to generate a documented listings.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding listings.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Record store JSON file (overrides the config's store.path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one page of a listing
    Render {
        /// articles, doctors, dentists, attorneys, issues, or category
        kind: ListingKind,
        /// Page to show (1-based)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        /// Filter option value, as listed by `options`
        #[arg(long)]
        filter: Option<String>,
        /// Render the articles of one issue, headed by the issue
        #[arg(long, conflicts_with = "filter")]
        issue: Option<String>,
        /// Write the page HTML here
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the filter options of a listing
    Options {
        kind: ListingKind,
    },
    /// Validate config and store without rendering
    Check,
    /// Print a stock listings.toml with all options documented
    GenConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Render {
            kind,
            page,
            filter,
            issue,
            out,
        } => {
            let (config, store) = load(&cli.config_dir, cli.store.as_deref())?;
            let doc = match issue {
                Some(id) => render_issue(&config, store, RecordId::new(id), page).await?,
                None => render_listing(&config, store, kind, page, filter.as_deref()).await?,
            };
            if let Some(out) = out {
                std::fs::write(&out, doc.render().into_string())?;
                println!("==> Wrote {}", out.display());
            }
        }
        Command::Options { kind } => {
            let (config, store) = load(&cli.config_dir, cli.store.as_deref())?;
            let bus = FilterBus::new(config.bus.capacity);
            let mut selector = FilterSelector::new(kind.dimension(), store, bus, &config);
            selector.initialize().await;
            output::print_options(selector.dimension(), selector.phase(), selector.options());
        }
        Command::Check => {
            let (config, store) = load(&cli.config_dir, cli.store.as_deref())?;
            let source = config_source(&cli.config_dir);
            let mut collections: Vec<(String, usize)> = store
                .collection_names()
                .map(|name| (name.to_string(), store.rows(name).len()))
                .collect();
            collections.sort();
            let audits: Vec<RowAudit> = ListingKind::ALL
                .into_iter()
                .map(|kind| audit_rows(kind, store.rows(kind.collection())))
                .collect();
            output::print_check(&config, source.as_deref(), &collections, &audits);
            let rejected: usize = audits.iter().map(|a| a.rejected).sum();
            if rejected == 0 {
                println!("==> Config and store are valid");
            } else {
                println!("==> {rejected} stored rows fail validation and will be skipped");
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Structured logs on stderr, filtered by `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("springs_listings=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config from `dir` and the record store it names.
fn load(
    dir: &Path,
    store_override: Option<&Path>,
) -> Result<(ListingsConfig, Arc<MemoryStore>), Box<dyn std::error::Error>> {
    let config = config::load_config(dir)?;
    let store_path = store_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(&config.store.path));
    let store = MemoryStore::load(&store_path)?;
    Ok((config, Arc::new(store)))
}

fn config_source(dir: &Path) -> Option<String> {
    let path = dir.join(CONFIG_FILENAME);
    path.exists().then(|| path.display().to_string())
}

async fn render_listing(
    config: &ListingsConfig,
    store: Arc<MemoryStore>,
    kind: ListingKind,
    page: u32,
    filter: Option<&str>,
) -> Result<Document, Box<dyn std::error::Error>> {
    let bus = FilterBus::new(config.bus.capacity);
    let mut listing = ListingPage::new(kind, store, &bus, config)?;
    let mut doc = Document::for_listing(kind.title(), &config.containers);

    match filter {
        None => {
            listing.initialize_at(&mut doc, page).await;
        }
        Some(value) => {
            listing.initialize(&mut doc).await;
            listing.select_filter(&mut doc, value).await?;
            if page > 1 {
                listing.show_page(&mut doc, page).await;
            }
        }
    }

    let filter_label = listing
        .selector()
        .and_then(|s| s.selected())
        .map(|o| o.label.as_str());
    print_page(&listing, kind.title(), filter_label);
    Ok(doc)
}

async fn render_issue(
    config: &ListingsConfig,
    store: Arc<MemoryStore>,
    issue: RecordId,
    page: u32,
) -> Result<Document, Box<dyn std::error::Error>> {
    let mut listing = ListingPage::issue(issue, store, config)?;
    let mut doc = Document::for_issue(&config.containers);
    listing.initialize_at(&mut doc, page).await;

    let title = listing
        .heading()
        .map(|h| h.title.clone())
        .unwrap_or_else(|| config.labels.magazine_issue.clone());
    print_page(&listing, &title, None);
    Ok(doc)
}

fn print_page(listing: &ListingPage<MemoryStore>, title: &str, filter_label: Option<&str>) {
    let controller = listing.controller();
    output::print_listing(&ListingSummary {
        title,
        phase: controller.phase(),
        current_page: controller.state().current_page(),
        total_pages: controller.state().total_pages(),
        total_count: controller.total_count(),
        filter_label,
        view: controller.view(),
    });
}
