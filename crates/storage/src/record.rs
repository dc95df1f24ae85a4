use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Report identity ──────────────────────────────────────────────────────────

/// The three report programs handled by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReportType {
    #[serde(rename = "MCPAR")]
    Mcpar,
    #[serde(rename = "MLR")]
    Mlr,
    #[serde(rename = "NAAAR")]
    Naaar,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::Mcpar, ReportType::Mlr, ReportType::Naaar];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Mcpar => "MCPAR",
            ReportType::Mlr => "MLR",
            ReportType::Naaar => "NAAAR",
        }
    }

    /// Whether a submitted report of this type can be released and
    /// submitted again, keeping each submitted revision.
    pub fn supports_resubmission(&self) -> bool {
        matches!(self, ReportType::Mlr)
    }

    /// Whether submitting a report of this type locks it against edits.
    pub fn locks_on_submit(&self) -> bool {
        matches!(self, ReportType::Mlr | ReportType::Naaar)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`ReportType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown report type '{0}'")]
pub struct UnknownReportType(pub String);

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownReportType(s.to_string()))
    }
}

/// Uniquely identifies one report. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKey {
    pub report_type: ReportType,
    pub state: String,
    pub id: String,
}

impl ReportKey {
    pub fn new(report_type: ReportType, state: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            report_type,
            state: state.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.report_type, self.state, self.id)
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Lifecycle status of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    #[default]
    #[serde(rename = "Not started")]
    NotStarted,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Submitted")]
    Submitted,
}

/// When a report is due: epoch milliseconds as computed at creation, or a
/// date string. Both shapes occur in stored records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DueDate {
    EpochMillis(i64),
    Text(String),
}

/// The authoritative index record for one report.
///
/// `form_template_id` and `field_data_id` are pointers into the template and
/// content stores. They are optional here because a broken record must still
/// deserialize; readers treat a missing pointer as a missing report.
///
/// Keys this type does not model (reporting period dates, combined-data
/// flags, ...) are carried verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub report_type: ReportType,
    pub state: String,
    pub id: String,
    #[serde(default)]
    pub form_template_id: Option<String>,
    #[serde(default)]
    pub field_data_id: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
    #[serde(default)]
    pub completion_status: BTreeMap<String, bool>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub last_altered_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_altered: Option<String>,
    #[serde(default)]
    pub program_name: String,
    #[serde(default)]
    pub submission_count: u32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub previous_revisions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DueDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_on_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportMetadata {
    /// A fresh `Not started` record with no pointers and no completion data.
    pub fn new(key: ReportKey) -> Self {
        Self {
            report_type: key.report_type,
            state: key.state,
            id: key.id,
            form_template_id: None,
            field_data_id: None,
            status: ReportStatus::NotStarted,
            completion_status: BTreeMap::new(),
            is_complete: false,
            last_altered_by: String::new(),
            last_altered: None,
            program_name: String::new(),
            submission_count: 0,
            locked: false,
            previous_revisions: Vec::new(),
            due_date: None,
            submitted_by: None,
            submitted_on_date: None,
            created_at: None,
            extra: Map::new(),
        }
    }

    pub fn key(&self) -> ReportKey {
        ReportKey::new(self.report_type, self.state.clone(), self.id.clone())
    }

    /// Recompute `is_complete` from `completion_status`.
    pub fn refresh_completion(&mut self) {
        self.is_complete = is_complete(&self.completion_status);
    }
}

/// Logical AND over all page flags. An empty map is never complete.
pub fn is_complete(completion_status: &BTreeMap<String, bool>) -> bool {
    !completion_status.is_empty() && completion_status.values().all(|done| *done)
}

// ── Form templates ───────────────────────────────────────────────────────────

/// One declared input within a page or an entity modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A page of a form template. Pages with children are groupings; only leaf
/// pages carry completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePage {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tracked: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_fields: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TemplatePage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TemplatePage {
    pub fn is_completion_tracked(&self) -> bool {
        self.children.is_empty() && self.completion_tracked.unwrap_or(true)
    }
}

/// An immutable, versioned form schema. Reports point at exactly one
/// template for their lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormTemplate {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_type: Option<ReportType>,
    #[serde(default)]
    pub pages: Vec<TemplatePage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormTemplate {
    /// Depth-first walk over every page, groupings included.
    pub fn pages(&self) -> Vec<&TemplatePage> {
        fn walk<'a>(pages: &'a [TemplatePage], out: &mut Vec<&'a TemplatePage>) {
            for page in pages {
                out.push(page);
                walk(&page.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.pages, &mut out);
        out
    }

    /// Ids of pages whose completion is tracked, in declaration order.
    pub fn completion_pages(&self) -> Vec<&str> {
        self.pages()
            .into_iter()
            .filter(|p| p.is_completion_tracked())
            .map(|p| p.id.as_str())
            .collect()
    }

    /// The completion map a new report on this template starts with.
    pub fn initial_completion_status(&self) -> BTreeMap<String, bool> {
        self.completion_pages()
            .into_iter()
            .map(|id| (id.to_string(), false))
            .collect()
    }

    pub fn declares_entity_type(&self, entity_type: &str) -> bool {
        self.pages()
            .iter()
            .any(|p| p.entity_type.as_deref() == Some(entity_type))
    }
}

// ── Field data ───────────────────────────────────────────────────────────────

/// The mutable answers of a report: a JSON object keyed by field and
/// entity-type ids. Values are scalars or arrays of entity objects.
///
/// The shape is governed by the report's [`FormTemplate`], so this is kept
/// as a dynamic document rather than a fixed struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldData(Map<String, Value>);

impl FieldData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The entity array stored under `entity_type`, if there is one.
    pub fn entities(&self, entity_type: &str) -> Option<&Vec<Value>> {
        self.0.get(entity_type).and_then(Value::as_array)
    }

    /// Shallow merge: every top-level key of `other` replaces the same key here.
    pub fn merge(&mut self, other: FieldData) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }
}

impl From<Map<String, Value>> for FieldData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The `id` of an entity object, if it has a string one.
pub fn entity_id(entity: &Value) -> Option<&str> {
    entity.get("id").and_then(Value::as_str)
}

/// A field-data document together with its store id and version stamp.
///
/// `version` starts at 0 when the document is created and increases by one
/// on every successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedFieldData {
    pub id: String,
    pub version: u64,
    pub data: FieldData,
}
