//! Axum + Askama front-end for the integrations roadmap, plus the static site export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use askama::Template;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use reqwest::Url;
use roadmap_core::{RecordField, RecordStore, RowKey, Status};
use roadmap_sources::{load_record_store, sources_from_settings, RecordSource, SourceSettings};
use roadmap_storage::{ArtifactStore, StoredArtifact};
use roadmap_view::{
    product_filter_options, RowView, SortOrder, ViewAction, ViewModelPipeline, ViewQuery, ViewState,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "roadmap-web";
pub const CONFIG_FILE: &str = "roadmap.yaml";
pub const STYLESHEET_PATH: &str = "assets/static/app.css";

const SORTABLE_FIELDS: [RecordField; 7] = [
    RecordField::DueDate,
    RecordField::Created,
    RecordField::Updated,
    RecordField::StartDate,
    RecordField::Summary,
    RecordField::Status,
    RecordField::PercentageTotal,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("public_url {url:?} is not an absolute URL: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Site settings from `roadmap.yaml`, with `ROADMAP_*` environment overrides applied on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub hero: String,
    pub description: String,
    pub download_url: Option<String>,
    pub public_url: Option<String>,
    pub web_port: u16,
    pub sources: SourceSettings,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Integrations Roadmap".to_string(),
            hero: "Seller API development Roadmap".to_string(),
            description: "Status of every connector currently on the integrations roadmap.".to_string(),
            download_url: None,
            public_url: None,
            web_port: 8000,
            sources: SourceSettings::default(),
        }
    }
}

impl SiteConfig {
    pub fn load(workspace_root: &Path) -> Result<Self, ConfigError> {
        let path = workspace_root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let yaml = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            serde_yaml::from_str(&yaml).map_err(|source| ConfigError::Yaml {
                path: path.clone(),
                source,
            })?
        } else {
            SiteConfig::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.public_url {
            Url::parse(url).map_err(|err| ConfigError::InvalidUrl {
                url: url.clone(),
                message: err.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("ROADMAP_DATA_PATH") {
            self.sources.data_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("ROADMAP_GRAPHQL_URL") {
            self.sources.graphql_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(port) = lookup("ROADMAP_WEB_PORT").and_then(|v| v.parse().ok()) {
            self.web_port = port;
        }
        if let Some(url) = lookup("ROADMAP_PUBLIC_URL") {
            self.public_url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub workspace_root: PathBuf,
    pub config: SiteConfig,
    pub store: RecordStore,
    pipeline: ViewModelPipeline,
}

impl AppState {
    pub fn new(workspace_root: impl Into<PathBuf>, config: SiteConfig, store: RecordStore) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            config,
            store,
            pipeline: ViewModelPipeline::default(),
        }
    }

    pub async fn load(workspace_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let workspace_root = workspace_root.into();
        let config = SiteConfig::load(&workspace_root)?;
        let store = load_store(&config, &workspace_root).await?;
        Ok(Self::new(workspace_root, config, store))
    }

    fn base_url(&self) -> String {
        self.config
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/", self.config.web_port))
    }
}

/// Load the local records and overlay the GraphQL ones when an endpoint is configured.
/// A failing endpoint degrades to the local records.
pub async fn load_store(config: &SiteConfig, workspace_root: &Path) -> anyhow::Result<RecordStore> {
    let (local, remote) = sources_from_settings(&config.sources, workspace_root)?;
    if let Some(remote) = &remote {
        match load_record_store(&local, Some(remote as &dyn RecordSource)).await {
            Ok(store) => return Ok(store),
            Err(err) => {
                warn!(endpoint = remote.endpoint(), error = %err, "remote roadmap unavailable; using local records")
            }
        }
    }
    load_record_store(&local, None)
        .await
        .with_context(|| format!("loading roadmap records from {}", local.path().display()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Served by the axum app; controls round-trip through htmx.
    Live,
    /// Written to disk by `export_static_site`; links are relative.
    Static,
}

#[derive(Debug, Clone)]
struct SelectOption {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Debug, Clone)]
struct TableRow {
    view: RowView,
    badge_class: &'static str,
    toggle_query: String,
    has_progress: bool,
    progress_label: String,
    progress_width: String,
    profile_link: String,
    supplier_note: String,
}

#[derive(Debug, Clone)]
struct TableView {
    rows: Vec<TableRow>,
    shown: usize,
    total: usize,
    live: bool,
    /// Comma-separated open rows, carried by the filter form.
    expanded: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    title: String,
    hero: String,
    description: String,
    stylesheet_href: String,
    download_url: String,
    share_url: String,
    search: String,
    status_options: Vec<SelectOption>,
    product_options: Vec<SelectOption>,
    sort_options: Vec<SelectOption>,
    order_options: Vec<SelectOption>,
    table: TableView,
}

#[derive(Template)]
#[template(path = "roadmap_table_partial.html")]
struct RoadmapTablePartialTemplate {
    table: TableView,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/roadmap/table", get(roadmap_table_handler))
        .route("/roadmap.json", get(roadmap_json_handler))
        .route("/share", get(share_handler))
        .route("/assets/static/app.css", get(app_css_handler))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("binding port {port}"))?;
    info!(port, records = state.store.len(), "serving roadmap");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Form-encoded query string (no leading `?`) that reproduces `state`.
pub fn encode_view_query(state: &ViewState) -> String {
    let pairs = state.query_pairs();
    if pairs.is_empty() {
        return String::new();
    }
    Url::parse("http://localhost/")
        .map(|mut url| {
            url.query_pairs_mut().extend_pairs(pairs);
            url.query().unwrap_or_default().to_string()
        })
        .unwrap_or_default()
}

/// Absolute link to the page showing `state`.
pub fn share_url(base: &str, state: &ViewState) -> anyhow::Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("invalid public url {base}"))?;
    url.set_query(None);
    let pairs = state.query_pairs();
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url.to_string())
}

fn table_view(state: &AppState, view_state: &ViewState, mode: RenderMode) -> TableView {
    let view = state.pipeline.run(state.store.records(), view_state);
    let rows = view
        .rows
        .into_iter()
        .map(|row| {
            let toggled = view_state.apply(ViewAction::ToggleRow(RowKey::for_summary(&row.summary)));
            let (has_progress, progress_label, progress_width) = match &row.progress {
                Some(p) => (true, p.label.clone(), format!("{}", p.width)),
                None => (false, String::new(), "0".to_string()),
            };
            TableRow {
                badge_class: row.badge.css_class(),
                toggle_query: encode_view_query(&toggled),
                has_progress,
                progress_label,
                progress_width,
                profile_link: row.profile_link.clone().unwrap_or_default(),
                supplier_note: row.supplier_note.clone().unwrap_or_default(),
                view: row,
            }
        })
        .collect();
    TableView {
        rows,
        shown: view.shown,
        total: view.total,
        live: mode == RenderMode::Live,
        expanded: view_state
            .expanded
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn select_options(view_state: &ViewState) -> [Vec<SelectOption>; 4] {
    let mut status_options = vec![SelectOption {
        value: String::new(),
        label: "All statuses".to_string(),
        selected: view_state.status_filter.is_empty(),
    }];
    status_options.extend(Status::KNOWN.iter().map(|status| SelectOption {
        value: status.label().to_string(),
        label: status.label().to_string(),
        selected: !view_state.status_filter.is_empty() && status.matches_filter(&view_state.status_filter),
    }));

    let mut product_options = vec![SelectOption {
        value: String::new(),
        label: "All products".to_string(),
        selected: view_state.product_filter.is_empty(),
    }];
    product_options.extend(product_filter_options().into_iter().map(|product| SelectOption {
        value: product.label().into_owned(),
        label: product.label().into_owned(),
        selected: !view_state.product_filter.is_empty() && product.matches_filter(&view_state.product_filter),
    }));

    let mut sort_options = vec![SelectOption {
        value: "none".to_string(),
        label: "Roadmap order".to_string(),
        selected: view_state.sort_field.is_none(),
    }];
    sort_options.extend(SORTABLE_FIELDS.iter().map(|field| SelectOption {
        value: field.name().to_string(),
        label: field.label().to_string(),
        selected: view_state.sort_field == Some(*field),
    }));

    let order_options = [SortOrder::Asc, SortOrder::Desc]
        .into_iter()
        .map(|order| SelectOption {
            value: order.as_str().to_string(),
            label: order.label().to_string(),
            selected: view_state.sort_order.unwrap_or(SortOrder::Asc) == order,
        })
        .collect();

    [status_options, product_options, sort_options, order_options]
}

pub fn render_index(state: &AppState, view_state: &ViewState, mode: RenderMode) -> anyhow::Result<String> {
    let [status_options, product_options, sort_options, order_options] = select_options(view_state);
    let (stylesheet_href, local_download) = match mode {
        RenderMode::Live => ("/assets/static/app.css", "/roadmap.json"),
        RenderMode::Static => (STYLESHEET_PATH, "roadmap.json"),
    };
    let share = match (mode, &state.config.public_url) {
        (RenderMode::Static, None) => String::new(),
        _ => share_url(&state.base_url(), view_state).unwrap_or_else(|err| {
            warn!(error = %err, "share link unavailable");
            String::new()
        }),
    };
    let tpl = IndexTemplate {
        title: state.config.title.clone(),
        hero: state.config.hero.clone(),
        description: state.config.description.clone(),
        stylesheet_href: stylesheet_href.to_string(),
        download_url: state
            .config
            .download_url
            .clone()
            .unwrap_or_else(|| local_download.to_string()),
        share_url: share,
        search: view_state.search.clone(),
        status_options,
        product_options,
        sort_options,
        order_options,
        table: table_view(state, view_state, mode),
    };
    Ok(tpl.render()?)
}

async fn index_handler(State(state): State<Arc<AppState>>, Query(query): Query<ViewQuery>) -> Response {
    let view_state = ViewState::from_query(&query);
    match render_index(&state, &view_state, RenderMode::Live) {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(err),
    }
}

async fn roadmap_table_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewQuery>,
) -> Response {
    let view_state = ViewState::from_query(&query);
    let mut resp = render_html(RoadmapTablePartialTemplate {
        table: table_view(&state, &view_state, RenderMode::Live),
    });
    resp.headers_mut().insert(
        header::HeaderName::from_static("hx-trigger"),
        header::HeaderValue::from_static("roadmapTableLoaded"),
    );
    resp
}

async fn roadmap_json_handler(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_DISPOSITION, "attachment; filename=\"roadmap.json\"")],
        Json(state.store.records().to_vec()),
    )
        .into_response()
}

async fn share_handler(State(state): State<Arc<AppState>>, Query(query): Query<ViewQuery>) -> Response {
    let view_state = ViewState::from_query(&query);
    match share_url(&state.base_url(), &view_state) {
        Ok(url) => Json(serde_json::json!({ "url": url })).into_response(),
        Err(err) => server_error(err),
    }
}

async fn app_css_handler(State(state): State<Arc<AppState>>) -> Response {
    let css_path = state.workspace_root.join(STYLESHEET_PATH);
    match tokio::fs::read_to_string(&css_path).await {
        Ok(css) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, Html("/* missing app.css */".to_string())).into_response(),
    }
}

fn render_html<T: Template>(tpl: T) -> Response {
    match tpl.render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => server_error(anyhow::anyhow!(err.to_string())),
    }
}

fn server_error(err: anyhow::Error) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(format!("Server error: {err:#}")),
    )
        .into_response()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub sha256: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildManifest {
    pub build_id: String,
    pub generated_at: String,
    pub title: String,
    pub record_count: usize,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub build_id: String,
    pub out_dir: PathBuf,
    pub record_count: usize,
    pub files: Vec<StoredArtifact>,
}

impl BuildSummary {
    pub fn unchanged_files(&self) -> usize {
        self.files.iter().filter(|f| f.unchanged).count()
    }
}

/// Write the default view, the records and the stylesheet to `out_dir`, then a manifest of their hashes.
pub async fn export_static_site(state: &AppState, out_dir: &Path) -> anyhow::Result<BuildSummary> {
    let build_id = Uuid::new_v4().to_string();
    let artifacts = ArtifactStore::new(out_dir);

    let html = render_index(state, &ViewState::default(), RenderMode::Static)?;
    let records = serde_json::to_vec_pretty(state.store.records()).context("serializing roadmap records")?;
    let css_path = state.workspace_root.join(STYLESHEET_PATH);
    let css = tokio::fs::read(&css_path)
        .await
        .with_context(|| format!("reading stylesheet {}", css_path.display()))?;

    let mut files = vec![
        artifacts.store_bytes("index.html", html.as_bytes()).await?,
        artifacts.store_bytes("roadmap.json", &records).await?,
        artifacts.store_bytes(STYLESHEET_PATH, &css).await?,
    ];

    let manifest = BuildManifest {
        build_id: build_id.clone(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        title: state.config.title.clone(),
        record_count: state.store.len(),
        files: files
            .iter()
            .map(|f| ManifestEntry {
                path: f.relative_path.to_string_lossy().replace('\\', "/"),
                sha256: f.content_hash.clone(),
                bytes: f.byte_size,
            })
            .collect(),
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest).context("serializing build manifest")?;
    files.push(artifacts.store_bytes("manifest.json", &manifest_bytes).await?);

    let summary = BuildSummary {
        build_id,
        out_dir: out_dir.to_path_buf(),
        record_count: state.store.len(),
        files,
    };
    info!(
        build_id = %summary.build_id,
        out_dir = %out_dir.display(),
        records = summary.record_count,
        unchanged = summary.unchanged_files(),
        "static roadmap site written"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use roadmap_sources::JsonFileSource;
    use tower::ServiceExt;

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../..")
            .canonicalize()
            .unwrap()
    }

    async fn fixture_state() -> AppState {
        let root = workspace_root();
        let source = JsonFileSource::new(root.join("data/roadmap.json"));
        let store = load_record_store(&source, None).await.expect("fixture store");
        let config = SiteConfig {
            public_url: Some("https://roadmap.example.com/".to_string()),
            ..SiteConfig::default()
        };
        AppState::new(root, config, store)
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let resp = app
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn env_overrides_replace_yaml_values() {
        let mut config = SiteConfig::default();
        config.apply_overrides(|key| match key {
            "ROADMAP_DATA_PATH" => Some("/srv/roadmap.json".to_string()),
            "ROADMAP_GRAPHQL_URL" => Some("  ".to_string()),
            "ROADMAP_WEB_PORT" => Some("9100".to_string()),
            _ => None,
        });
        assert_eq!(config.sources.data_path, PathBuf::from("/srv/roadmap.json"));
        assert_eq!(config.sources.graphql_url, None);
        assert_eq!(config.web_port, 9100);
        assert_eq!(config.public_url, None);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: SiteConfig = serde_yaml::from_str("title: Custom\nsources:\n  graphql_url: https://api.example.com/graphql\n")
            .expect("yaml");
        assert_eq!(config.title, "Custom");
        assert_eq!(config.hero, SiteConfig::default().hero);
        assert_eq!(config.sources.data_path, PathBuf::from("data/roadmap.json"));
        assert_eq!(
            config.sources.graphql_url.as_deref(),
            Some("https://api.example.com/graphql")
        );
    }

    #[test]
    fn share_url_carries_view_state() {
        let state = ViewState::default().apply(ViewAction::SetSearch("hotel & spa".into()));
        let url = share_url("https://roadmap.example.com/?stale=1", &state).unwrap();
        assert_eq!(url, "https://roadmap.example.com/?q=hotel+%26+spa");
        assert_eq!(
            share_url("https://roadmap.example.com/", &ViewState::default()).unwrap(),
            "https://roadmap.example.com/"
        );
        assert!(share_url("not a url", &state).is_err());
        assert_eq!(encode_view_query(&ViewState::default()), "");
    }

    #[test]
    fn schemeless_public_url_is_rejected_on_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "public_url: roadmap.example.com\n").unwrap();
        let err = SiteConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { ref url, .. } if url == "roadmap.example.com"));
    }

    #[tokio::test]
    async fn bad_share_base_still_renders_the_page() {
        let mut state = fixture_state().await;
        state.config.public_url = Some("roadmap.example.com".to_string());
        let html = render_index(&state, &ViewState::default(), RenderMode::Live).expect("render");
        assert!(html.contains("Acme Hotels"));
        assert!(!html.contains("id=\"share-url\""));

        let (status, _, _) = get_text(app(state), "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn table_partial_carries_open_rows_into_the_filter_form() {
        let key = RowKey::for_summary("Acme Hotels");
        let uri = format!("/roadmap/table?expanded={key}");
        let (status, _, text) = get_text(app(fixture_state().await), &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains(&format!(
            "name=\"expanded\" value=\"{key}\" form=\"roadmap-controls\""
        )));

        let (_, _, collapsed) = get_text(app(fixture_state().await), "/roadmap/table").await;
        assert!(!collapsed.contains("name=\"expanded\""));
    }

    #[tokio::test]
    async fn index_renders_every_fixture_row() {
        let (status, _, text) = get_text(app(fixture_state().await), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(text.contains("Seller API development Roadmap"));
        assert!(text.contains("Acme Hotels"));
        assert!(text.contains("Glacier Inns"));
        assert!(text.contains("Showing 7 of 7 connectors"));
        assert!(text.contains("text-bg-neutral"));
    }

    #[tokio::test]
    async fn table_partial_filters_and_triggers_htmx_event() {
        let (status, headers, text) =
            get_text(app(fixture_state().await), "/roadmap/table?status=completed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["hx-trigger"], "roadmapTableLoaded");
        assert!(text.contains("Blue Lagoon Resorts"));
        assert!(text.contains("Fjord Apartments"));
        assert!(!text.contains("Acme Hotels"));
        assert!(text.contains("Developed by supplier"));
    }

    #[tokio::test]
    async fn roadmap_json_is_a_download() {
        let (status, headers, text) = get_text(app(fixture_state().await), "/roadmap.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment"));
        let rows: Vec<serde_json::Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0]["Summary"], "Acme Hotels");
    }

    #[tokio::test]
    async fn share_endpoint_returns_public_url_with_state() {
        let (status, _, text) = get_text(app(fixture_state().await), "/share?q=acme&sort=summary&order=desc").await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            body["url"],
            "https://roadmap.example.com/?q=acme&sort=summary&order=desc"
        );
    }

    #[tokio::test]
    async fn stylesheet_is_served() {
        let (status, headers, _) = get_text(app(fixture_state().await), "/assets/static/app.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/css; charset=utf-8");
    }

    #[tokio::test]
    async fn static_export_writes_manifest_with_hashes() {
        let out = tempfile::tempdir().expect("tempdir");
        let state = fixture_state().await;
        let summary = export_static_site(&state, out.path()).await.expect("export");
        assert_eq!(summary.files.len(), 4);
        assert_eq!(summary.record_count, 7);

        let manifest: BuildManifest =
            serde_json::from_slice(&std::fs::read(out.path().join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest.build_id, summary.build_id);
        let paths: Vec<_> = manifest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "roadmap.json", STYLESHEET_PATH]);
        let index = std::fs::read(out.path().join("index.html")).unwrap();
        assert_eq!(manifest.files[0].sha256, ArtifactStore::sha256_hex(&index));
        let html = String::from_utf8(index).unwrap();
        assert!(html.contains("href=\"assets/static/app.css\""));

        let again = export_static_site(&state, out.path()).await.expect("second export");
        assert_eq!(again.unchanged_files(), 3);
    }
}
