//! Record source contracts + local JSON and GraphQL implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use roadmap_core::{Product, RecordError, RecordField, RecordStore, RoadmapRecord};
use roadmap_storage::{FetchError, HttpClientConfig, HttpFetcher};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "roadmap-sources";

/// Query served by the roadmap GraphQL gateway.
pub const DEFAULT_ROADMAP_QUERY: &str = r#"query {
  allRoadmapJson {
    edges {
      node {
        Summary
        Created
        Updated
        Resolved
        Status
        Due_date
        Start_date
        Target_start
        Target_end
        Profile_Link
        External_Description
      }
    }
  }
}"#;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{origin}: {message}")]
    Shape { origin: String, message: String },
    #[error("graphql endpoint {url} returned errors: {messages}")]
    Graphql { url: String, messages: String },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("http client setup failed: {0}")]
    Client(String),
    #[error(transparent)]
    Record(#[from] RecordError),
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    fn source_id(&self) -> &str;

    async fn load(&self) -> Result<Vec<RoadmapRecord>, SourceError>;
}

/// Where records come from, as configured in `roadmap.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub data_path: PathBuf,
    #[serde(default)]
    pub graphql_url: Option<String>,
    #[serde(default)]
    pub graphql_query: Option<String>,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    20
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/roadmap.json"),
            graphql_url: None,
            graphql_query: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// The static roadmap export on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for JsonFileSource {
    fn source_id(&self) -> &str {
        "json-file"
    }

    async fn load(&self) -> Result<Vec<RoadmapRecord>, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_records(&self.path.display().to_string(), &text)
    }
}

/// Remote variant: a subset of record fields served over GraphQL.
#[derive(Debug, Clone)]
pub struct GraphqlSource {
    endpoint: String,
    query: String,
    http: HttpFetcher,
}

impl GraphqlSource {
    pub fn new(endpoint: impl Into<String>, http: HttpFetcher) -> Self {
        Self {
            endpoint: endpoint.into(),
            query: DEFAULT_ROADMAP_QUERY.to_string(),
            http,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RecordSource for GraphqlSource {
    fn source_id(&self) -> &str {
        "graphql"
    }

    async fn load(&self) -> Result<Vec<RoadmapRecord>, SourceError> {
        let body = serde_json::json!({ "query": self.query });
        let response = self.http.post_json(&self.endpoint, &body).await?;
        records_from_graphql_response(&self.endpoint, response)
    }
}

/// Decode a GraphQL reply, surfacing the `errors` array when present.
pub fn records_from_graphql_response(
    url: &str,
    response: JsonValue,
) -> Result<Vec<RoadmapRecord>, SourceError> {
    if let Some(errors) = response.get("errors").and_then(|e| e.as_array()) {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .map(ToString::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SourceError::Graphql {
                url: url.to_string(),
                messages,
            });
        }
    }
    let data = response.get("data").cloned().ok_or_else(|| SourceError::Shape {
        origin: url.to_string(),
        message: "response has no `data` member".to_string(),
    })?;
    records_from_value(url, data)
}

/// Parse roadmap JSON text: a bare array, an `edges[].node` envelope, or a wrapped query result.
pub fn parse_records(origin: &str, text: &str) -> Result<Vec<RoadmapRecord>, SourceError> {
    let value: JsonValue = serde_json::from_str(text).map_err(|source| SourceError::Parse {
        origin: origin.to_string(),
        source,
    })?;
    records_from_value(origin, value)
}

fn records_from_value(origin: &str, value: JsonValue) -> Result<Vec<RoadmapRecord>, SourceError> {
    let nodes = unwrap_record_list(value).ok_or_else(|| SourceError::Shape {
        origin: origin.to_string(),
        message: "expected an array of records or an `edges[].node` list".to_string(),
    })?;
    nodes
        .into_iter()
        .map(|node| {
            serde_json::from_value::<RoadmapRecord>(node).map_err(|source| SourceError::Parse {
                origin: origin.to_string(),
                source,
            })
        })
        .collect()
}

fn unwrap_record_list(value: JsonValue) -> Option<Vec<JsonValue>> {
    match value {
        JsonValue::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    JsonValue::Object(mut map) if map.len() == 1 && map.contains_key("node") => {
                        map.remove("node").unwrap_or(JsonValue::Null)
                    }
                    other => other,
                })
                .collect(),
        ),
        JsonValue::Object(mut map) => {
            if let Some(edges) = map.remove("edges") {
                return unwrap_record_list(edges);
            }
            if let Some(data) = map.remove("data") {
                return unwrap_record_list(data);
            }
            if map.len() == 1 {
                let (_, only) = map.into_iter().next()?;
                return unwrap_record_list(only);
            }
            None
        }
        _ => None,
    }
}

/// Overlay `remote` onto `local`, matching on summary case-insensitively.
///
/// Non-empty remote values win; remote-only records are appended after the local ones.
pub fn merge_records(local: Vec<RoadmapRecord>, remote: Vec<RoadmapRecord>) -> Vec<RoadmapRecord> {
    let mut merged = local;
    for incoming in remote {
        let key = incoming.summary.trim().to_lowercase();
        let position = merged
            .iter()
            .position(|r| r.summary.trim().to_lowercase() == key);
        match position {
            Some(index) => overlay_record(&mut merged[index], incoming),
            None => merged.push(incoming),
        }
    }
    merged
}

fn overlay_record(existing: &mut RoadmapRecord, incoming: RoadmapRecord) {
    if !incoming.status.label().is_empty() {
        existing.status = incoming.status.clone();
    }
    if incoming.product != Product::default() {
        existing.product = incoming.product.clone();
    }
    if !incoming.external_description.trim().is_empty() {
        existing.external_description = incoming.external_description.clone();
    }
    if incoming.percentage_total.is_some() {
        existing.percentage_total = incoming.percentage_total;
    }
    let mut incoming = incoming;
    for field in RecordField::ALL {
        let Some(value) = incoming
            .optional_text_mut(field)
            .and_then(Option::take)
            .filter(|v| !v.trim().is_empty())
        else {
            continue;
        };
        if let Some(slot) = existing.optional_text_mut(field) {
            *slot = Some(value);
        }
    }
}

fn warn_on_suspicious_values(records: &[RoadmapRecord]) {
    for record in records {
        if let Some(pct) = record.percentage_total {
            if !(0.0..=100.0).contains(&pct) {
                warn!(summary = %record.summary, pct, "percentage outside 0-100; progress bar will be clamped");
            }
        }
        if !record.status.is_known() {
            warn!(summary = %record.summary, status = %record.status, "unrecognized status");
        }
    }
}

/// Build the configured sources: the local file, plus the GraphQL overlay when an endpoint is set.
pub fn sources_from_settings(
    settings: &SourceSettings,
    workspace_root: &Path,
) -> Result<(JsonFileSource, Option<GraphqlSource>), SourceError> {
    let data_path = if settings.data_path.is_absolute() {
        settings.data_path.clone()
    } else {
        workspace_root.join(&settings.data_path)
    };
    let local = JsonFileSource::new(data_path);
    let remote = match &settings.graphql_url {
        Some(url) if !url.trim().is_empty() => {
            let http = HttpFetcher::new(HttpClientConfig {
                timeout: Duration::from_secs(settings.http_timeout_secs),
                ..Default::default()
            })
            .map_err(|err| SourceError::Client(format!("{err:#}")))?;
            let source = GraphqlSource::new(url.trim(), http);
            Some(match &settings.graphql_query {
                Some(query) => source.with_query(query.clone()),
                None => source,
            })
        }
        _ => None,
    };
    Ok((local, remote))
}

/// Load the primary source, overlay the optional remote one, and freeze the result.
pub async fn load_record_store(
    primary: &dyn RecordSource,
    overlay: Option<&dyn RecordSource>,
) -> Result<RecordStore, SourceError> {
    let mut records = primary.load().await?;
    info!(source = primary.source_id(), count = records.len(), "loaded roadmap records");
    if let Some(overlay) = overlay {
        let remote = overlay.load().await?;
        info!(source = overlay.source_id(), count = remote.len(), "merging remote roadmap records");
        records = merge_records(records, remote);
    }
    warn_on_suspicious_values(&records);
    Ok(RecordStore::new(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap_core::Status;

    struct StaticSource(Vec<RoadmapRecord>);

    #[async_trait]
    impl RecordSource for StaticSource {
        fn source_id(&self) -> &str {
            "static"
        }

        async fn load(&self) -> Result<Vec<RoadmapRecord>, SourceError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn parses_bare_arrays_and_gatsby_envelopes() {
        let bare = r#"[{"Summary": "A", "Status": "ToDo"}]"#;
        assert_eq!(parse_records("bare", bare).unwrap()[0].summary, "A");

        let wrapped = r#"{"data": {"allRoadmapJson": {"edges": [
            {"node": {"Summary": "A"}},
            {"node": {"Summary": "B", "Status": "completed"}}
        ]}}}"#;
        let records = parse_records("wrapped", wrapped).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, Status::Completed);
    }

    #[test]
    fn unexpected_shapes_are_reported() {
        let err = parse_records("odd", r#"{"a": 1, "b": 2}"#).unwrap_err();
        assert!(matches!(err, SourceError::Shape { .. }));
        let err = parse_records("broken", "[{").unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn graphql_errors_are_surfaced() {
        let response = serde_json::json!({
            "errors": [{"message": "field Foo unknown"}, {"message": "denied"}]
        });
        let err = records_from_graphql_response("https://gw/graphql", response).unwrap_err();
        match err {
            SourceError::Graphql { messages, .. } => assert_eq!(messages, "field Foo unknown; denied"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn graphql_data_under_a_server_root_is_unwrapped() {
        let response = serde_json::json!({
            "data": {"server": {"allRoadmapJson": {"edges": [{"node": {"Summary": "Remote", "Due_date": "May 2024"}}]}}}
        });
        let records = records_from_graphql_response("gw", response).unwrap();
        assert_eq!(records[0].summary, "Remote");
        assert_eq!(records[0].due_date.as_deref(), Some("May 2024"));
    }

    #[test]
    fn merge_overlays_non_empty_remote_fields_and_appends_new_records() {
        let mut local_a = RoadmapRecord::new("Acme", Status::Planned, Product::Pull);
        local_a.due_date = Some("January 2024".into());
        local_a.analysis = Some("Done".into());
        local_a.external_description = "local text".into();
        let local_b = RoadmapRecord::new("Beta", Status::ToDo, Product::Push);

        let mut remote_a = RoadmapRecord::new("ACME ", Status::InProgress, Product::default());
        remote_a.due_date = Some("March 2024".into());
        remote_a.start_date = Some("  ".into());
        let remote_c = RoadmapRecord::new("Gamma", Status::Completed, Product::Hybrid);

        let merged = merge_records(vec![local_a, local_b], vec![remote_a, remote_c]);
        assert_eq!(
            merged.iter().map(|r| r.summary.as_str()).collect::<Vec<_>>(),
            vec!["Acme", "Beta", "Gamma"]
        );
        let acme = &merged[0];
        assert_eq!(acme.status, Status::InProgress);
        assert_eq!(acme.product, Product::Pull);
        assert_eq!(acme.due_date.as_deref(), Some("March 2024"));
        assert_eq!(acme.start_date, None);
        assert_eq!(acme.analysis.as_deref(), Some("Done"));
        assert_eq!(acme.external_description, "local text");
    }

    #[tokio::test]
    async fn store_loading_merges_overlay_and_validates() {
        let primary = StaticSource(vec![RoadmapRecord::new("A", Status::ToDo, Product::Pull)]);
        let overlay = StaticSource(vec![RoadmapRecord::new("B", Status::Completed, Product::Push)]);
        let store = load_record_store(&primary, Some(&overlay as &dyn RecordSource)).await.unwrap();
        assert_eq!(store.len(), 2);

        let bad = StaticSource(vec![RoadmapRecord::new("", Status::ToDo, Product::Pull)]);
        let err = load_record_store(&bad, None).await.unwrap_err();
        assert!(matches!(err, SourceError::Record(RecordError::EmptySummary { index: 0 })));
    }

    #[tokio::test]
    async fn json_file_source_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = JsonFileSource::new(dir.path().join("missing.json"));
        assert!(matches!(source.load().await, Err(SourceError::Io { .. })));

        let path = dir.path().join("roadmap.json");
        std::fs::write(&path, r#"[{"Summary": "Only"}]"#).unwrap();
        let records = JsonFileSource::new(&path).load().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn settings_without_endpoint_build_only_the_file_source() {
        let settings = SourceSettings::default();
        let (local, remote) = sources_from_settings(&settings, Path::new("/srv/site")).unwrap();
        assert_eq!(local.path(), Path::new("/srv/site/data/roadmap.json"));
        assert!(remote.is_none());
    }
}
