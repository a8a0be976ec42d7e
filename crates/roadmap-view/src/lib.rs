//! Roadmap view-model pipeline: filter, sort and presentation over an immutable record list.
//!
//! Every run is a pure function of `(records, ViewState)`; nothing is cached between runs.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use roadmap_core::{
    format_date, FieldKind, Product, RecordField, RoadmapDate, RoadmapRecord, RowKey, Status,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CRATE_NAME: &str = "roadmap-view";

pub const DEFAULT_SORT_FIELD: RecordField = RecordField::DueDate;
pub const DEFAULT_SORT_ORDER: SortOrder = SortOrder::Asc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Asc),
            "desc" | "descending" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    /// Wording used by the sort selector for date columns.
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Asc => "Oldest to newest",
            SortOrder::Desc => "Newest to oldest",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the user can change on the page. Transitions go through [`ViewState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search: String,
    /// Empty means "all statuses".
    pub status_filter: String,
    /// Empty means "all products".
    pub product_filter: String,
    pub sort_field: Option<RecordField>,
    pub sort_order: Option<SortOrder>,
    pub expanded: BTreeSet<RowKey>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search: String::new(),
            status_filter: String::new(),
            product_filter: String::new(),
            sort_field: Some(DEFAULT_SORT_FIELD),
            sort_order: Some(DEFAULT_SORT_ORDER),
            expanded: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    SetSearch(String),
    SetStatusFilter(String),
    SetProductFilter(String),
    SetSort {
        field: Option<RecordField>,
        order: Option<SortOrder>,
    },
    ToggleRow(RowKey),
    CollapseAll,
    Reset,
}

/// Raw query-string form of a [`ViewState`]; every member is optional and parsed leniently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub expanded: Option<String>,
}

impl ViewState {
    /// Keep the loaded order: no sort field and no direction.
    pub fn unsorted() -> Self {
        Self {
            sort_field: None,
            sort_order: None,
            ..Self::default()
        }
    }

    pub fn apply(&self, action: ViewAction) -> ViewState {
        let mut next = self.clone();
        match action {
            ViewAction::SetSearch(term) => next.search = term,
            ViewAction::SetStatusFilter(status) => next.status_filter = status,
            ViewAction::SetProductFilter(product) => next.product_filter = product,
            ViewAction::SetSort { field, order } => {
                next.sort_field = field;
                next.sort_order = order;
            }
            ViewAction::ToggleRow(key) => {
                if !next.expanded.remove(&key) {
                    next.expanded.insert(key);
                }
            }
            ViewAction::CollapseAll => next.expanded.clear(),
            ViewAction::Reset => next = ViewState::default(),
        }
        next
    }

    pub fn is_expanded(&self, key: &RowKey) -> bool {
        self.expanded.contains(key)
    }

    pub fn from_query(query: &ViewQuery) -> Self {
        let sort_field = match query.sort.as_deref().map(str::trim) {
            None => Some(DEFAULT_SORT_FIELD),
            Some("") | Some("none") => None,
            Some(name) => RecordField::parse(name),
        };
        let sort_order = match query.order.as_deref().map(str::trim) {
            None => Some(DEFAULT_SORT_ORDER),
            Some("") | Some("none") => None,
            Some(raw) => SortOrder::parse(raw),
        };
        let expanded = query
            .expanded
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|token| token.parse::<RowKey>().ok())
            .collect();
        Self {
            search: query.q.clone().unwrap_or_default(),
            status_filter: query.status.clone().unwrap_or_default(),
            product_filter: query.product.clone().unwrap_or_default(),
            sort_field,
            sort_order,
            expanded,
        }
    }

    /// Query parameters that reproduce this state; defaults are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.search.is_empty() {
            pairs.push(("q", self.search.clone()));
        }
        if !self.status_filter.is_empty() {
            pairs.push(("status", self.status_filter.clone()));
        }
        if !self.product_filter.is_empty() {
            pairs.push(("product", self.product_filter.clone()));
        }
        if self.sort_field != Some(DEFAULT_SORT_FIELD) || self.sort_order != Some(DEFAULT_SORT_ORDER) {
            pairs.push((
                "sort",
                self.sort_field.map(|f| f.name()).unwrap_or("none").to_string(),
            ));
            pairs.push((
                "order",
                self.sort_order.map(|o| o.as_str()).unwrap_or("none").to_string(),
            ));
        }
        if !self.expanded.is_empty() {
            let keys = self
                .expanded
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("expanded", keys));
        }
        pairs
    }

    pub fn to_query(&self) -> ViewQuery {
        let mut query = ViewQuery::default();
        for (key, value) in self.query_pairs() {
            let slot = match key {
                "q" => &mut query.q,
                "status" => &mut query.status,
                "product" => &mut query.product,
                "sort" => &mut query.sort,
                "order" => &mut query.order,
                _ => &mut query.expanded,
            };
            *slot = Some(value);
        }
        query
    }
}

/// `statusMatches AND productMatches AND (summaryMatches OR anyTextFieldMatches)`.
#[derive(Debug, Clone, Default)]
pub struct FilterStage {
    needle: String,
    status: String,
    product: String,
}

impl FilterStage {
    pub fn new(search: &str, status: &str, product: &str) -> Self {
        Self {
            needle: search.to_lowercase(),
            status: status.to_string(),
            product: product.to_string(),
        }
    }

    pub fn from_state(state: &ViewState) -> Self {
        Self::new(&state.search, &state.status_filter, &state.product_filter)
    }

    pub fn matches(&self, record: &RoadmapRecord) -> bool {
        if !record.status.matches_filter(&self.status) || !record.product.matches_filter(&self.product) {
            return false;
        }
        if self.needle.is_empty() {
            return true;
        }
        self.contains(&record.summary)
            || RecordField::ALL
                .iter()
                .filter(|f| f.kind() != FieldKind::Number)
                .filter_map(|f| record.text(*f))
                .any(|value| self.contains(&value))
    }

    pub fn apply<'a>(&self, records: &'a [RoadmapRecord]) -> Vec<&'a RoadmapRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    fn contains(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.needle)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Date(RoadmapDate),
    Text(String),
    Number(f64),
}

impl SortKey {
    fn of(record: &RoadmapRecord, field: RecordField) -> Option<Self> {
        match field.kind() {
            FieldKind::Date => record.date(field).map(SortKey::Date),
            FieldKind::Number => record.number(field).map(SortKey::Number),
            FieldKind::Text => record
                .text(field)
                .filter(|t| !t.trim().is_empty())
                .map(|t| SortKey::Text(t.to_lowercase())),
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            // a field always yields one kind of key
            _ => Ordering::Equal,
        }
    }
}

/// Stable ordering by one field. Missing or unparseable values go last in either direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStage {
    field: Option<RecordField>,
    order: Option<SortOrder>,
}

impl SortStage {
    pub fn new(field: Option<RecordField>, order: Option<SortOrder>) -> Self {
        Self { field, order }
    }

    pub fn from_state(state: &ViewState) -> Self {
        Self::new(state.sort_field, state.sort_order)
    }

    pub fn compare(&self, a: &RoadmapRecord, b: &RoadmapRecord) -> Ordering {
        let (Some(field), Some(order)) = (self.field, self.order) else {
            return Ordering::Equal;
        };
        match (SortKey::of(a, field), SortKey::of(b, field)) {
            (Some(ka), Some(kb)) => {
                let ord = ka.cmp(&kb);
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    pub fn apply<'a>(&self, mut rows: Vec<&'a RoadmapRecord>) -> Vec<&'a RoadmapRecord> {
        if self.field.is_some() && self.order.is_some() {
            rows.sort_by(|a, b| self.compare(a, b));
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeTag {
    Todo,
    Planned,
    InProgress,
    InCertification,
    Completed,
    Neutral,
}

impl BadgeTag {
    pub fn for_status(status: &Status) -> Self {
        match status {
            Status::ToDo => BadgeTag::Todo,
            Status::Planned => BadgeTag::Planned,
            Status::InProgress => BadgeTag::InProgress,
            Status::InCertification => BadgeTag::InCertification,
            Status::Completed => BadgeTag::Completed,
            Status::Unknown(_) => BadgeTag::Neutral,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            BadgeTag::Todo => "text-bg-todo",
            BadgeTag::Planned => "text-bg-planned",
            BadgeTag::InProgress => "text-bg-in-progress",
            BadgeTag::InCertification => "text-bg-in-certification",
            BadgeTag::Completed => "text-bg-completed",
            BadgeTag::Neutral => "text-bg-neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailLine {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineView {
    pub status: String,
    pub available: String,
    pub added: String,
    pub development_start: String,
    pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub label: String,
    /// Bar width, clamped to 0..=100.
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub index: usize,
    pub row_key: String,
    pub summary: String,
    pub status_label: String,
    pub badge: BadgeTag,
    pub product_label: String,
    pub has_timeline: bool,
    pub available: String,
    pub progress: Option<ProgressView>,
    pub profile_link: Option<String>,
    pub description: String,
    pub expanded: bool,
    pub timeline: Option<TimelineView>,
    pub supplier_note: Option<String>,
    pub details: Vec<DetailLine>,
}

#[derive(Debug, Clone)]
pub struct PresentationMapper {
    supplier_note: String,
}

impl Default for PresentationMapper {
    fn default() -> Self {
        Self {
            supplier_note: "Developed by supplier".to_string(),
        }
    }
}

impl PresentationMapper {
    pub fn map_row(&self, index: usize, record: &RoadmapRecord, state: &ViewState) -> RowView {
        let row_key = record.row_key();
        let has_timeline = record.product.has_timeline();
        let timeline = has_timeline.then(|| TimelineView {
            status: record.status.label().to_string(),
            available: record.due_date.clone().unwrap_or_default(),
            added: format_date(record.created.as_deref()),
            development_start: format_date(record.start_date.as_deref()),
            last_update: format_date(record.updated.as_deref()),
        });
        let details = record
            .product
            .detail_fields()
            .iter()
            .map(|field| DetailLine {
                label: field.label(),
                value: record.text(*field).map(|v| v.into_owned()).unwrap_or_default(),
            })
            .collect();

        RowView {
            index,
            row_key: row_key.to_string(),
            summary: record.summary.clone(),
            status_label: record.status.label().to_string(),
            badge: BadgeTag::for_status(&record.status),
            product_label: record.product.label().into_owned(),
            has_timeline,
            available: if has_timeline {
                format_date(record.due_date.as_deref())
            } else {
                String::new()
            },
            progress: record.percentage_total.map(|pct| ProgressView {
                label: pct.to_string(),
                width: pct.clamp(0.0, 100.0),
            }),
            profile_link: record.profile_link.clone().filter(|l| !l.trim().is_empty()),
            description: record.external_description.clone(),
            expanded: state.is_expanded(&row_key),
            timeline,
            supplier_note: (!has_timeline).then(|| self.supplier_note.clone()),
            details,
        }
    }

    pub fn map_all(&self, rows: &[&RoadmapRecord], state: &ViewState) -> Vec<RowView> {
        rows.iter()
            .enumerate()
            .map(|(index, record)| self.map_row(index, record, state))
            .collect()
    }
}

/// Derived table for one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadmapView {
    pub rows: Vec<RowView>,
    pub total: usize,
    pub shown: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ViewModelPipeline {
    mapper: PresentationMapper,
}

impl ViewModelPipeline {
    /// Filtered + sorted record references, before presentation.
    pub fn select<'a>(&self, records: &'a [RoadmapRecord], state: &ViewState) -> Vec<&'a RoadmapRecord> {
        let filtered = FilterStage::from_state(state).apply(records);
        SortStage::from_state(state).apply(filtered)
    }

    pub fn run(&self, records: &[RoadmapRecord], state: &ViewState) -> RoadmapView {
        let selected = self.select(records, state);
        let rows = self.mapper.map_all(&selected, state);
        debug!(
            total = records.len(),
            shown = rows.len(),
            search = %state.search,
            status = %state.status_filter,
            "roadmap view recomputed"
        );
        RoadmapView {
            shown: rows.len(),
            total: records.len(),
            rows,
        }
    }
}

/// Products offered by the product filter, in display order.
pub fn product_filter_options() -> Vec<Product> {
    vec![Product::Pull, Product::Push, Product::Hybrid]
}
