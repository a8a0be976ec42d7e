//! Core domain model for the integrations roadmap.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

pub const CRATE_NAME: &str = "roadmap-core";

/// Display format for roadmap dates (`Jan 2024`).
pub const DATE_DISPLAY_FORMAT: &str = "%b %Y";

/// Lowercase alphanumerics only, so `In Progress`, `in_progress` and `INPROGRESS` agree.
fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    ToDo,
    Planned,
    InProgress,
    InCertification,
    Completed,
    /// Anything outside the known vocabulary, kept verbatim.
    Unknown(String),
}

impl Default for Status {
    fn default() -> Self {
        Status::Unknown(String::new())
    }
}

impl Status {
    pub const KNOWN: [Status; 5] = [
        Status::InProgress,
        Status::Completed,
        Status::Planned,
        Status::InCertification,
        Status::ToDo,
    ];

    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "todo" => Status::ToDo,
            "planned" => Status::Planned,
            "inprogress" => Status::InProgress,
            "incertification" => Status::InCertification,
            "completed" => Status::Completed,
            _ => Status::Unknown(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Status::ToDo => "ToDo",
            Status::Planned => "Planned",
            Status::InProgress => "In Progress",
            Status::InCertification => "In Certification",
            Status::Completed => "Completed",
            Status::Unknown(raw) => raw,
        }
    }

    /// Case-insensitive equality against a filter value. A blank filter matches everything;
    /// a filter with no alphanumerics matches nothing.
    pub fn matches_filter(&self, filter: &str) -> bool {
        if filter.trim().is_empty() {
            return true;
        }
        let wanted = normalize_token(filter);
        !wanted.is_empty() && normalize_token(self.label()) == wanted
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Status::Unknown(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Status::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Product {
    Pull,
    Push,
    Hybrid,
    Other(String),
}

impl Default for Product {
    fn default() -> Self {
        Product::Other(String::new())
    }
}

impl Product {
    pub fn parse(raw: &str) -> Self {
        match normalize_token(raw).as_str() {
            "pull" => Product::Pull,
            "push" => Product::Push,
            // the upstream sheet spells it "hibrid"
            "hybrid" | "hibrid" => Product::Hybrid,
            _ => Product::Other(raw.trim().to_string()),
        }
    }

    /// First letter kept, rest lowercased (`PULL` -> `Pull`).
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Product::Pull => Cow::Borrowed("Pull"),
            Product::Push => Cow::Borrowed("Push"),
            Product::Hybrid => Cow::Borrowed("Hybrid"),
            Product::Other(raw) => {
                let mut chars = raw.chars();
                match chars.next() {
                    Some(first) => Cow::Owned(first.to_string() + &chars.as_str().to_lowercase()),
                    None => Cow::Borrowed(""),
                }
            }
        }
    }

    /// Same rules as [`Status::matches_filter`]; `hibrid` still selects `Hybrid`.
    pub fn matches_filter(&self, filter: &str) -> bool {
        if filter.trim().is_empty() {
            return true;
        }
        let wanted = normalize_token(filter);
        !wanted.is_empty()
            && (Product::parse(filter) == *self || normalize_token(&self.label()) == wanted)
    }

    /// Pull, Push and Hybrid connectors are built in-house and carry a timeline.
    pub fn has_timeline(&self) -> bool {
        matches!(self, Product::Pull | Product::Push | Product::Hybrid)
    }

    /// Narrative fields surfaced in the detail row for this product.
    pub fn detail_fields(&self) -> &'static [RecordField] {
        match self {
            Product::Pull => &[
                RecordField::Analysis,
                RecordField::Content,
                RecordField::Search,
                RecordField::Management,
                RecordField::Configuration,
                RecordField::Validation,
            ],
            Product::Push => &[
                RecordField::Analysis,
                RecordField::Setup,
                RecordField::ProductLoad,
                RecordField::BookingFlow,
            ],
            Product::Hybrid | Product::Other(_) => &[],
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Product {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Product::Other(raw) => serializer.serialize_str(raw),
            known => serializer.serialize_str(&known.label()),
        }
    }
}

impl<'de> Deserialize<'de> for Product {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Product::parse(&raw))
    }
}

/// A roadmap date resolved to a calendar day; month-only inputs land on the 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoadmapDate(NaiveDate);

impl RoadmapDate {
    /// Accepts `January 2024`, `Jan 2024`, `2024-01-15`, `2024-01` and RFC 3339 timestamps.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(date) = parse_month_year(raw) {
            return Some(Self(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
            return Some(Self(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(ts.date_naive()));
        }
        if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(Self(ts.date_naive()));
        }
        None
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn display(&self) -> String {
        self.0.format(DATE_DISPLAY_FORMAT).to_string()
    }
}

/// Format any raw date text for display. Never fails: unparseable input yields `""`.
pub fn format_date(raw: Option<&str>) -> String {
    raw.and_then(RoadmapDate::parse)
        .map(|d| d.display())
        .unwrap_or_default()
}

fn parse_month_year(raw: &str) -> Option<NaiveDate> {
    let mut tokens = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    let month = month_token_to_number(&tokens.next()?.to_ascii_lowercase())?;
    let year_token = tokens.next()?;
    if tokens.next().is_some() || year_token.len() != 4 {
        return None;
    }
    let year = year_token.parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_token_to_number(token: &str) -> Option<u32> {
    match token {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sept" | "sep" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Number,
}

/// Declarative column schema of a roadmap record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    Summary,
    Status,
    Product,
    DueDate,
    Created,
    Updated,
    StartDate,
    Resolved,
    TargetStart,
    TargetEnd,
    ProfileLink,
    ExternalDescription,
    PercentageTotal,
    Analysis,
    Content,
    Search,
    Management,
    Configuration,
    Validation,
    Setup,
    ProductLoad,
    BookingFlow,
}

impl RecordField {
    pub const ALL: [RecordField; 22] = [
        RecordField::Summary,
        RecordField::Status,
        RecordField::Product,
        RecordField::DueDate,
        RecordField::Created,
        RecordField::Updated,
        RecordField::StartDate,
        RecordField::Resolved,
        RecordField::TargetStart,
        RecordField::TargetEnd,
        RecordField::ProfileLink,
        RecordField::ExternalDescription,
        RecordField::PercentageTotal,
        RecordField::Analysis,
        RecordField::Content,
        RecordField::Search,
        RecordField::Management,
        RecordField::Configuration,
        RecordField::Validation,
        RecordField::Setup,
        RecordField::ProductLoad,
        RecordField::BookingFlow,
    ];

    pub fn kind(self) -> FieldKind {
        match self {
            RecordField::DueDate
            | RecordField::Created
            | RecordField::Updated
            | RecordField::StartDate
            | RecordField::Resolved
            | RecordField::TargetStart
            | RecordField::TargetEnd => FieldKind::Date,
            RecordField::PercentageTotal => FieldKind::Number,
            _ => FieldKind::Text,
        }
    }

    /// Key used in the roadmap JSON export.
    pub fn source_key(self) -> &'static str {
        match self {
            RecordField::Summary => "Summary",
            RecordField::Status => "Status",
            RecordField::Product => "Product",
            RecordField::DueDate => "Due_date",
            RecordField::Created => "Created",
            RecordField::Updated => "Updated",
            RecordField::StartDate => "Start_date",
            RecordField::Resolved => "Resolved",
            RecordField::TargetStart => "Target_start",
            RecordField::TargetEnd => "Target_end",
            RecordField::ProfileLink => "Profile_Link",
            RecordField::ExternalDescription => "External_Description",
            RecordField::PercentageTotal => "Percentage_Total",
            RecordField::Analysis => "Analisys",
            RecordField::Content => "Content",
            RecordField::Search => "Search",
            RecordField::Management => "Management",
            RecordField::Configuration => "Configuration_Dev",
            RecordField::Validation => "Validation",
            RecordField::Setup => "SetUp",
            RecordField::ProductLoad => "Product_Load",
            RecordField::BookingFlow => "Booking_Flow",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordField::Summary => "Connector",
            RecordField::Status => "Status",
            RecordField::Product => "Product",
            RecordField::DueDate => "Available",
            RecordField::Created => "Added to roadmap",
            RecordField::Updated => "Last Update",
            RecordField::StartDate => "Development Start",
            RecordField::Resolved => "Resolved",
            RecordField::TargetStart => "Target Start",
            RecordField::TargetEnd => "Target End",
            RecordField::ProfileLink => "Profile Link",
            RecordField::ExternalDescription => "Description",
            RecordField::PercentageTotal => "Progress completed",
            RecordField::Analysis => "Analysis",
            RecordField::Content => "Content",
            RecordField::Search => "Search",
            RecordField::Management => "Management",
            RecordField::Configuration => "Configuration",
            RecordField::Validation => "Validation",
            RecordField::Setup => "SetUp",
            RecordField::ProductLoad => "Product Load",
            RecordField::BookingFlow => "Booking Flow",
        }
    }

    /// snake_case name used in URLs and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            RecordField::Summary => "summary",
            RecordField::Status => "status",
            RecordField::Product => "product",
            RecordField::DueDate => "due_date",
            RecordField::Created => "created",
            RecordField::Updated => "updated",
            RecordField::StartDate => "start_date",
            RecordField::Resolved => "resolved",
            RecordField::TargetStart => "target_start",
            RecordField::TargetEnd => "target_end",
            RecordField::ProfileLink => "profile_link",
            RecordField::ExternalDescription => "external_description",
            RecordField::PercentageTotal => "percentage_total",
            RecordField::Analysis => "analysis",
            RecordField::Content => "content",
            RecordField::Search => "search",
            RecordField::Management => "management",
            RecordField::Configuration => "configuration",
            RecordField::Validation => "validation",
            RecordField::Setup => "setup",
            RecordField::ProductLoad => "product_load",
            RecordField::BookingFlow => "booking_flow",
        }
    }

    /// Resolves snake_case names, camelCase names and source keys alike.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = normalize_token(raw);
        if wanted.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|field| {
            normalize_token(field.name()) == wanted || normalize_token(field.source_key()) == wanted
        })
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown record field `{0}`")]
pub struct UnknownField(pub String);

impl FromStr for RecordField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// Stable row identity derived from a record summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey(Uuid);

impl RowKey {
    pub fn for_summary(summary: &str) -> Self {
        Self(Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("roadmap:{summary}").as_bytes(),
        ))
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RowKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One connector entry as published in the roadmap JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadmapRecord {
    #[serde(rename = "Summary", alias = "summary", default, deserialize_with = "string_or_null")]
    pub summary: String,
    #[serde(rename = "Status", alias = "status", default)]
    pub status: Status,
    #[serde(rename = "Product", alias = "product", default)]
    pub product: Product,
    #[serde(rename = "Due_date", alias = "dueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(rename = "Created", alias = "createdDate", alias = "created", default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(rename = "Updated", alias = "updatedDate", alias = "updated", default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(rename = "Start_date", alias = "startDate", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "Resolved", alias = "resolvedDate", alias = "resolved", default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(rename = "Target_start", alias = "targetStart", default, skip_serializing_if = "Option::is_none")]
    pub target_start: Option<String>,
    #[serde(rename = "Target_end", alias = "targetEnd", default, skip_serializing_if = "Option::is_none")]
    pub target_end: Option<String>,
    #[serde(rename = "Profile_Link", alias = "profileLink", default, skip_serializing_if = "Option::is_none")]
    pub profile_link: Option<String>,
    #[serde(rename = "External_Description", alias = "externalDescription", default, deserialize_with = "string_or_null")]
    pub external_description: String,
    #[serde(
        rename = "Percentage_Total",
        alias = "percentageTotal",
        default,
        deserialize_with = "lenient_percentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub percentage_total: Option<f64>,
    #[serde(rename = "Analisys", alias = "analysis", default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(rename = "Content", alias = "content", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "Search", alias = "search", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "Management", alias = "management", default, skip_serializing_if = "Option::is_none")]
    pub management: Option<String>,
    #[serde(rename = "Configuration_Dev", alias = "configuration", default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    #[serde(rename = "Validation", alias = "validation", default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<String>,
    #[serde(rename = "SetUp", alias = "setup", default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<String>,
    #[serde(rename = "Product_Load", alias = "productLoad", default, skip_serializing_if = "Option::is_none")]
    pub product_load: Option<String>,
    #[serde(rename = "Booking_Flow", alias = "bookingFlow", default, skip_serializing_if = "Option::is_none")]
    pub booking_flow: Option<String>,
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Numbers and numeric strings (`"40"`, `"40%"`) are accepted; anything else is absent.
fn lenient_percentage<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite()))
}

impl RoadmapRecord {
    pub fn new(summary: impl Into<String>, status: Status, product: Product) -> Self {
        Self {
            summary: summary.into(),
            status,
            product,
            ..Default::default()
        }
    }

    pub fn row_key(&self) -> RowKey {
        RowKey::for_summary(&self.summary)
    }

    fn raw_text(&self, field: RecordField) -> Option<&str> {
        let value = match field {
            RecordField::Summary => return Some(&self.summary),
            RecordField::ExternalDescription => return Some(&self.external_description),
            RecordField::Status | RecordField::Product | RecordField::PercentageTotal => return None,
            RecordField::DueDate => &self.due_date,
            RecordField::Created => &self.created,
            RecordField::Updated => &self.updated,
            RecordField::StartDate => &self.start_date,
            RecordField::Resolved => &self.resolved,
            RecordField::TargetStart => &self.target_start,
            RecordField::TargetEnd => &self.target_end,
            RecordField::ProfileLink => &self.profile_link,
            RecordField::Analysis => &self.analysis,
            RecordField::Content => &self.content,
            RecordField::Search => &self.search,
            RecordField::Management => &self.management,
            RecordField::Configuration => &self.configuration,
            RecordField::Validation => &self.validation,
            RecordField::Setup => &self.setup,
            RecordField::ProductLoad => &self.product_load,
            RecordField::BookingFlow => &self.booking_flow,
        };
        value.as_deref()
    }

    /// String value of a text or date field; `None` for numbers and absent fields.
    pub fn text(&self, field: RecordField) -> Option<Cow<'_, str>> {
        match field {
            RecordField::Status => Some(Cow::Borrowed(self.status.label())),
            RecordField::Product => Some(self.product.label()),
            _ => self.raw_text(field).map(Cow::Borrowed),
        }
    }

    pub fn number(&self, field: RecordField) -> Option<f64> {
        match field {
            RecordField::PercentageTotal => self.percentage_total,
            _ => None,
        }
    }

    pub fn date(&self, field: RecordField) -> Option<RoadmapDate> {
        if field.kind() != FieldKind::Date {
            return None;
        }
        self.raw_text(field).and_then(RoadmapDate::parse)
    }

    /// Mutable handle on an optional text or date field, used when merging sources.
    pub fn optional_text_mut(&mut self, field: RecordField) -> Option<&mut Option<String>> {
        let slot = match field {
            RecordField::DueDate => &mut self.due_date,
            RecordField::Created => &mut self.created,
            RecordField::Updated => &mut self.updated,
            RecordField::StartDate => &mut self.start_date,
            RecordField::Resolved => &mut self.resolved,
            RecordField::TargetStart => &mut self.target_start,
            RecordField::TargetEnd => &mut self.target_end,
            RecordField::ProfileLink => &mut self.profile_link,
            RecordField::Analysis => &mut self.analysis,
            RecordField::Content => &mut self.content,
            RecordField::Search => &mut self.search,
            RecordField::Management => &mut self.management,
            RecordField::Configuration => &mut self.configuration,
            RecordField::Validation => &mut self.validation,
            RecordField::Setup => &mut self.setup,
            RecordField::ProductLoad => &mut self.product_load,
            RecordField::BookingFlow => &mut self.booking_flow,
            RecordField::Summary
            | RecordField::Status
            | RecordField::Product
            | RecordField::ExternalDescription
            | RecordField::PercentageTotal => return None,
        };
        Some(slot)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record #{index} has an empty summary")]
    EmptySummary { index: usize },
    #[error("record #{index} repeats summary `{summary}`")]
    DuplicateSummary { index: usize, summary: String },
}

/// Immutable, cheaply clonable list of records as loaded from a source.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<[RoadmapRecord]>,
}

impl RecordStore {
    pub fn new(records: Vec<RoadmapRecord>) -> Result<Self, RecordError> {
        let mut seen = HashSet::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.summary.trim().is_empty() {
                return Err(RecordError::EmptySummary { index });
            }
            if !seen.insert(record.summary.as_str()) {
                return Err(RecordError::DuplicateSummary {
                    index,
                    summary: record.summary.clone(),
                });
            }
        }
        Ok(Self {
            records: records.into(),
        })
    }

    pub fn records(&self) -> &[RoadmapRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoadmapRecord> {
        self.records.iter()
    }

    pub fn find(&self, key: RowKey) -> Option<&RoadmapRecord> {
        self.records.iter().find(|r| r.row_key() == key)
    }
}
