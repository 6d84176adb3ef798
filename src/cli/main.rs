use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nohrs_extensions::core::config::GalleryConfig;
use nohrs_extensions::core::telemetry::logging::init_logging_with;
use nohrs_extensions::pages::extensions::{ContentState, ExtensionsPage, ExtensionsServices, VirtualList};
use nohrs_extensions::pages::Page;
use nohrs_extensions::services::gallery::{FileContentFetcher, LocalCatalog, WorkspaceSettings};
use nohrs_extensions::services::markdown::MarkdownRenderer;
use nohrs_extensions::ui::element::{ElementTree, Size};
use nohrs_extensions::ui::theme::classes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

#[derive(Parser)]
#[command(name = "nohrs-extensions", about = "Search an extension catalog headlessly")]
struct Cli {
    /// JSON catalog: an array of extensions or `{ "extensions": [...] }`
    #[arg(long)]
    catalog: PathBuf,

    /// Gallery configuration (defaults to ~/.nohrs/extensions.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workspace settings used for proxy resolution
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON object mapping installed extension ids to versions
    #[arg(long)]
    installed: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a query and print the rows a viewport would show
    Search {
        query: String,

        /// Viewport height in pixels
        #[arg(long, default_value_t = 600.0)]
        height: f32,

        /// Scroll so this row is at the top
        #[arg(long)]
        scroll: Option<usize>,

        /// Highlight this row and print its readme
        #[arg(long)]
        select: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging_with(if cli.verbose { "debug" } else { "info" });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    LocalSet::new().block_on(&runtime, run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config.clone().or_else(GalleryConfig::default_path) {
        Some(path) => GalleryConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GalleryConfig::default(),
    };
    let services = build_services(&cli)?;

    let tree = ElementTree::shared();
    let host = tree.borrow_mut().create("body");
    let mut page = ExtensionsPage::new(Rc::clone(&tree), config.clone(), services);
    page.create_view(host);

    let Command::Search {
        query,
        height,
        scroll,
        select,
    } = cli.command;

    page.layout(Size::new(800.0, height));
    page.set_visible(true);
    if let Some(pending) = page.search_now(&query) {
        pending.await;
    }

    let list = page
        .list()
        .cloned()
        .context("extensions view was not created")?;
    if let Some(index) = scroll {
        list.scroll_to_index(index);
    }
    wait_for_rows(&list).await;

    println!("{} results for {:?}", list.model().len(), query);
    for (index, entry) in list.rendered_rows() {
        match entry {
            Some(entry) => println!(
                "{index:>5}  {:<40} {:<10} {}",
                entry.id(),
                entry.version().unwrap_or("-"),
                entry.state().as_str()
            ),
            None => println!("{index:>5}  (loading)"),
        }
    }

    if let Some(index) = select {
        print_highlight(&page, index).await;
    }

    page.dispose();
    Ok(())
}

fn build_services(cli: &Cli) -> Result<ExtensionsServices> {
    let catalog = LocalCatalog::from_path(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog.display()))?;

    let settings = match &cli.settings {
        Some(path) => WorkspaceSettings::load(path)
            .with_context(|| format!("loading settings {}", path.display()))?,
        None => WorkspaceSettings::new(Default::default()),
    };

    let installed: HashMap<String, String> = match &cli.installed {
        Some(path) => read_installed(path)?,
        None => HashMap::new(),
    };

    let base_dir = cli
        .catalog
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    Ok(ExtensionsServices {
        gallery: Rc::new(catalog),
        installed: Rc::new(installed),
        proxy: Rc::new(settings),
        fetcher: Rc::new(FileContentFetcher::with_base_dir(base_dir)),
        renderer: Rc::new(MarkdownRenderer::new()),
    })
}

fn read_installed(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading installed extensions {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Waits until no rendered row belongs to a page that is still loading.
async fn wait_for_rows(list: &VirtualList) {
    loop {
        let model = list.model();
        let loading = list
            .rendered_rows()
            .iter()
            .any(|(index, _)| model.is_loading(model.page_of(*index)));
        if !loading {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn print_highlight(page: &ExtensionsPage, index: usize) {
    let Some(highlight) = page.highlight() else {
        return;
    };
    if !page.select(index) || highlight.active_index() != Some(index) {
        eprintln!("row {index} cannot be highlighted");
        return;
    }
    page.finish_transitions();

    while highlight.content_state() == Some(ContentState::Pending) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let tree = page.tree().borrow();
    let body = highlight
        .active_element()
        .and_then(|row| tree.find_by_class(row, classes::BODY));
    match body.and_then(|body| tree.markup(body)) {
        Some(markup) => println!("\n{markup}"),
        None => println!("\n(no readme)"),
    }
}
