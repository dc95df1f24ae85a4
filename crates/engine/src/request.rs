//! Raw request key components and their validation.
//!
//! Path parameters arrive as optional strings. Every engine entry point
//! converts them here first, so a missing or empty component is rejected as
//! a malformed request before any store is consulted.

use mcr_storage::{ReportKey, ReportType};
use serde::Deserialize;

use crate::error::{ReportError, NO_KEY};

/// `{reportType, state}` as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// `{reportType, state, id}` as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyParams {
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// A report key plus the entity type (and optionally entity id) addressed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityParams {
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
}

impl ScopeParams {
    pub fn new(report_type: &str, state: &str) -> Self {
        Self {
            report_type: Some(report_type.to_string()),
            state: Some(state.to_string()),
        }
    }

    pub fn parse(&self) -> Result<(ReportType, String), ReportError> {
        let state = required(self.state.as_deref())?;
        let report_type = parse_report_type(self.report_type.as_deref())?;
        Ok((report_type, state.to_string()))
    }
}

impl KeyParams {
    pub fn new(report_type: &str, state: &str, id: &str) -> Self {
        Self {
            report_type: Some(report_type.to_string()),
            state: Some(state.to_string()),
            id: Some(id.to_string()),
        }
    }

    pub fn parse(&self) -> Result<ReportKey, ReportError> {
        let state = required(self.state.as_deref())?;
        let id = required(self.id.as_deref())?;
        let report_type = parse_report_type(self.report_type.as_deref())?;
        Ok(ReportKey::new(report_type, state, id))
    }
}

impl From<&ReportKey> for KeyParams {
    fn from(key: &ReportKey) -> Self {
        Self::new(key.report_type.as_str(), &key.state, &key.id)
    }
}

impl EntityParams {
    pub fn new(key: &ReportKey, entity_type: &str, entity_id: Option<&str>) -> Self {
        Self {
            report_type: Some(key.report_type.as_str().to_string()),
            state: Some(key.state.clone()),
            id: Some(key.id.clone()),
            entity_type: Some(entity_type.to_string()),
            entity_id: entity_id.map(str::to_string),
        }
    }

    pub fn key_params(&self) -> KeyParams {
        KeyParams {
            report_type: self.report_type.clone(),
            state: self.state.clone(),
            id: self.id.clone(),
        }
    }

    /// The report key and entity type. The entity id is not required here.
    pub fn parse(&self) -> Result<(ReportKey, String), ReportError> {
        let key = self.key_params().parse()?;
        let entity_type = required(self.entity_type.as_deref())?;
        Ok((key, entity_type.to_string()))
    }

    pub fn parse_entity_id(&self) -> Result<String, ReportError> {
        required(self.entity_id.as_deref()).map(str::to_string)
    }
}

fn required(value: Option<&str>) -> Result<&str, ReportError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ReportError::malformed(NO_KEY)),
    }
}

fn parse_report_type(value: Option<&str>) -> Result<ReportType, ReportError> {
    required(value)?
        .parse()
        .map_err(|e: mcr_storage::UnknownReportType| ReportError::malformed(e.to_string()))
}
