use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use roadmap_core::RecordField;
use roadmap_sources::{load_record_store, sources_from_settings, RecordSource};
use roadmap_storage::ArtifactStore;
use roadmap_view::{SortOrder, ViewModelPipeline, ViewQuery, ViewState};
use roadmap_web::{export_static_site, serve, AppState, SiteConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "roadmap")]
#[command(about = "Integrations roadmap site builder")]
struct Cli {
    /// Directory holding roadmap.yaml, data/ and assets/.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render the static site.
    Build {
        #[arg(long, default_value = "public")]
        out: PathBuf,
    },
    /// Serve the live roadmap page.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the filtered and sorted roadmap.
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "")]
        status: String,
        #[arg(long, default_value = "")]
        product: String,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        order: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Pull the GraphQL roadmap, merge it into the local records and write the result.
    Fetch {
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Build { out: PathBuf::from("public") }) {
        Commands::Build { out } => {
            let state = AppState::load(&cli.root).await?;
            let summary = export_static_site(&state, &out).await?;
            println!(
                "build complete: build_id={} records={} files={} unchanged={} out={}",
                summary.build_id,
                summary.record_count,
                summary.files.len(),
                summary.unchanged_files(),
                summary.out_dir.display()
            );
        }
        Commands::Serve { port } => {
            let state = AppState::load(&cli.root).await?;
            let port = port.unwrap_or(state.config.web_port);
            serve(state, port).await?;
        }
        Commands::List {
            search,
            status,
            product,
            sort,
            order,
            json,
        } => {
            let view_state = list_view_state(search, status, product, sort, order)?;
            let state = AppState::load(&cli.root).await?;
            let view = ViewModelPipeline::default().run(state.store.records(), &view_state);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{:<32} {:<18} {:<10} {:<10} {:>8}", "CONNECTOR", "STATUS", "PRODUCT", "AVAILABLE", "PROGRESS");
                for row in &view.rows {
                    let progress = row
                        .progress
                        .as_ref()
                        .map(|p| format!("{}%", p.label))
                        .unwrap_or_default();
                    println!(
                        "{:<32} {:<18} {:<10} {:<10} {:>8}",
                        row.summary, row.status_label, row.product_label, row.available, progress
                    );
                }
                println!("showing {} of {} connectors", view.shown, view.total);
            }
        }
        Commands::Fetch { output } => {
            let written = fetch_and_merge(&cli.root, output).await?;
            println!("fetch complete: wrote {}", written.display());
        }
    }

    Ok(())
}

fn list_view_state(
    search: String,
    status: String,
    product: String,
    sort: Option<String>,
    order: Option<String>,
) -> Result<ViewState> {
    if let Some(field) = sort.as_deref().filter(|s| *s != "none") {
        if RecordField::parse(field).is_none() {
            bail!("unknown sort field {field:?}");
        }
    }
    if let Some(order) = order.as_deref().filter(|o| *o != "none") {
        if SortOrder::parse(order).is_none() {
            bail!("sort order must be asc or desc, got {order:?}");
        }
    }
    Ok(ViewState::from_query(&ViewQuery {
        q: Some(search),
        status: Some(status),
        product: Some(product),
        sort,
        order,
        expanded: None,
    }))
}

async fn fetch_and_merge(root: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
    let config = SiteConfig::load(root)?;
    let (local, remote) = sources_from_settings(&config.sources, root)?;
    let Some(remote) = remote else {
        bail!("no GraphQL endpoint configured; set sources.graphql_url or ROADMAP_GRAPHQL_URL");
    };
    let store = load_record_store(&local, Some(&remote as &dyn RecordSource))
        .await
        .with_context(|| format!("fetching roadmap from {}", remote.endpoint()))?;

    let output = output.unwrap_or_else(|| local.path().to_path_buf());
    let file_name = output
        .file_name()
        .with_context(|| format!("output path {} has no file name", output.display()))?;
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let bytes = serde_json::to_vec_pretty(store.records())?;
    let stored = ArtifactStore::new(dir).store_bytes(file_name, &bytes).await?;
    info!(
        records = store.len(),
        unchanged = stored.unchanged,
        path = %stored.absolute_path.display(),
        "merged roadmap written"
    );
    Ok(stored.absolute_path)
}
