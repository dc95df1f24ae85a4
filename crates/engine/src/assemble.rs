//! Report assembler: the read path.
//!
//! A report is reconstructed from three sources on every read: its metadata
//! record, the form template it points at, and the field-data document it
//! points at. Template and field data are resolved concurrently. A pointer
//! that is empty or does not resolve makes the whole report NotFound; a
//! partially assembled report is never returned.

use mcr_storage::{
    FieldData, FormTemplate, ReportMetadata, StorageError, VersionedFieldData,
};
use serde::Serialize;

use crate::access::{authorize, AccessScope, Action};
use crate::engine::ReportEngine;
use crate::error::ReportError;
use crate::principal::Principal;
use crate::request::{KeyParams, ScopeParams};

/// The assembled, read-only view of one report. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(flatten)]
    pub metadata: ReportMetadata,
    pub field_data: FieldData,
    /// Version stamp of `field_data`, for compare-and-swap on the next write.
    pub field_data_version: u64,
    pub form_template: FormTemplate,
}

impl Report {
    pub(crate) fn from_parts(
        mut metadata: ReportMetadata,
        form_template: FormTemplate,
        field_data: VersionedFieldData,
    ) -> Self {
        metadata.refresh_completion();
        Self {
            metadata,
            field_data: field_data.data,
            field_data_version: field_data.version,
            form_template,
        }
    }
}

/// List-view projection of a report: metadata only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReportSummary {
    pub metadata: ReportMetadata,
}

impl From<ReportMetadata> for ReportSummary {
    fn from(mut metadata: ReportMetadata) -> Self {
        metadata.refresh_completion();
        Self { metadata }
    }
}

/// Template and field data resolved for one metadata record.
pub(crate) struct Resolved {
    pub(crate) template: FormTemplate,
    pub(crate) field_data: VersionedFieldData,
}

impl ReportEngine {
    /// Fetch and assemble one report.
    pub async fn fetch_one(
        &self,
        principal: &Principal,
        params: &KeyParams,
    ) -> Result<Report, ReportError> {
        let key = params.parse()?;
        authorize(
            principal,
            &AccessScope::unlocked(key.report_type, &key.state),
            Action::Read,
        )
        .into_result()?;

        let metadata = self
            .stores
            .metadata
            .get_metadata(&key)
            .await?
            .ok_or_else(|| {
                tracing::debug!(report = %key, "no metadata record");
                ReportError::NotFound
            })?;
        self.assemble(metadata).await
    }

    /// Summaries of every report of one type in one state, in the metadata
    /// store's native order.
    pub async fn fetch_by_state(
        &self,
        principal: &Principal,
        params: &ScopeParams,
    ) -> Result<Vec<ReportSummary>, ReportError> {
        let (report_type, state) = params.parse()?;
        authorize(
            principal,
            &AccessScope::unlocked(report_type, &state),
            Action::Read,
        )
        .into_result()?;

        let records = self
            .stores
            .metadata
            .query_metadata(report_type, &state)
            .await?;
        Ok(records.into_iter().map(ReportSummary::from).collect())
    }

    /// Like [`fetch_by_state`](Self::fetch_by_state) but fully assembled.
    /// Reports that fail to assemble are left out rather than failing the
    /// whole list.
    pub async fn fetch_by_state_expanded(
        &self,
        principal: &Principal,
        params: &ScopeParams,
    ) -> Result<Vec<Report>, ReportError> {
        let (report_type, state) = params.parse()?;
        authorize(
            principal,
            &AccessScope::unlocked(report_type, &state),
            Action::Read,
        )
        .into_result()?;

        let records = self
            .stores
            .metadata
            .query_metadata(report_type, &state)
            .await?;

        let mut reports = Vec::with_capacity(records.len());
        for metadata in records {
            let key = metadata.key();
            match self.assemble(metadata).await {
                Ok(report) => reports.push(report),
                Err(ReportError::NotFound) => {
                    tracing::debug!(report = %key, "omitting report with dangling reference");
                }
                Err(e) => {
                    tracing::warn!(report = %key, error = %e, "omitting report that failed to assemble");
                }
            }
        }
        Ok(reports)
    }

    /// Merge metadata with its resolved template and field data.
    pub(crate) async fn assemble(&self, metadata: ReportMetadata) -> Result<Report, ReportError> {
        let Resolved {
            template,
            field_data,
        } = self.resolve(&metadata).await?;
        Ok(Report::from_parts(metadata, template, field_data))
    }

    /// Resolve both pointers of `metadata` concurrently.
    pub(crate) async fn resolve(&self, metadata: &ReportMetadata) -> Result<Resolved, ReportError> {
        let key = metadata.key();
        let (Some(template_id), Some(field_data_id)) = (
            non_empty(metadata.form_template_id.as_deref()),
            non_empty(metadata.field_data_id.as_deref()),
        ) else {
            tracing::debug!(report = %key, "metadata is missing a template or field data pointer");
            return Err(ReportError::NotFound);
        };

        let (template, field_data) = tokio::join!(
            self.stores.templates.get_template(template_id),
            self.stores.content.get_field_data(field_data_id),
        );

        let template = found(template).inspect_err(|_| {
            tracing::debug!(report = %key, template_id, "form template did not resolve");
        })?;
        let field_data = found(field_data).inspect_err(|_| {
            tracing::debug!(report = %key, field_data_id, "field data did not resolve");
        })?;

        Ok(Resolved {
            template,
            field_data,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Absent documents and adapter-reported missing documents are NotFound.
/// Any other adapter fault stays a storage failure.
fn found<T>(result: Result<Option<T>, StorageError>) -> Result<T, ReportError> {
    match result {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(ReportError::NotFound),
        Err(e) => Err(e.into()),
    }
}
