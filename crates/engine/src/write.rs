//! Report write path: create, update, entity writes, submit and release.
//!
//! Every write is sequenced content first, then metadata. The two stores
//! are independent, so a metadata failure after a content success leaves
//! the new content in place with stale audit metadata; that case is logged
//! and surfaced as a storage failure.

use std::collections::BTreeMap;

use mcr_storage::{
    generate_id, DueDate, FieldData, FormTemplate, ReportKey, ReportMetadata, ReportStatus,
    VersionedFieldData,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::access::{authorize, authorize_override, AccessScope, Action};
use crate::assemble::{Report, Resolved};
use crate::engine::{now_rfc3339, ReportEngine};
use crate::entity::{apply_entity_change, EntityChange};
use crate::error::{ReportError, NO_KEY};
use crate::principal::Principal;
use crate::request::{EntityParams, KeyParams, ScopeParams};

/// Metadata keys owned by the engine. Patches cannot set them.
const RESERVED_METADATA_KEYS: &[&str] = &[
    "reportType",
    "state",
    "id",
    "formTemplateId",
    "fieldDataId",
    "status",
    "isComplete",
    "lastAlteredBy",
    "lastAltered",
    "submissionCount",
    "locked",
    "previousRevisions",
    "submittedBy",
    "submittedOnDate",
    "createdAt",
    "fieldData",
    "fieldDataVersion",
    "formTemplate",
];

/// Caller-settable metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(default)]
    pub program_name: Option<String>,
    #[serde(default)]
    pub due_date: Option<DueDate>,
    /// Page completion flags. Only pages the template tracks are accepted.
    #[serde(default)]
    pub completion_status: Option<BTreeMap<String, bool>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    pub form_template_id: Option<String>,
    #[serde(default)]
    pub metadata: MetadataPatch,
    #[serde(default)]
    pub field_data: FieldData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReportRequest {
    #[serde(default)]
    pub field_data: Option<FieldData>,
    #[serde(default)]
    pub metadata: Option<MetadataPatch>,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityWriteOutcome {
    pub entity_id: String,
    /// `false` when the change was a no-op and nothing was written.
    pub changed: bool,
    pub report: Report,
}

impl ReportEngine {
    /// Create a new report from a template.
    pub async fn create_report(
        &self,
        principal: &Principal,
        params: &ScopeParams,
        request: CreateReportRequest,
    ) -> Result<Report, ReportError> {
        let (report_type, state) = params.parse()?;
        let template_id = request
            .form_template_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ReportError::malformed(NO_KEY))?;
        authorize(
            principal,
            &AccessScope::unlocked(report_type, &state),
            Action::Write,
        )
        .into_result()?;

        let template = self
            .stores
            .templates
            .get_template(template_id)
            .await?
            .ok_or(ReportError::NotFound)?;
        if template.report_type.is_some_and(|t| t != report_type) {
            return Err(ReportError::malformed(format!(
                "form template {template_id} is not a {report_type} template"
            )));
        }

        let key = ReportKey::new(report_type, state, generate_id());
        let mut metadata = ReportMetadata::new(key.clone());
        metadata.completion_status = template.initial_completion_status();
        apply_patch(&mut metadata, request.metadata, &template)?;

        let field_data = self
            .stores
            .content
            .put_field_data(None, request.field_data, None)
            .await?;

        let now = now_rfc3339();
        metadata.form_template_id = Some(template.id.clone());
        metadata.field_data_id = Some(field_data.id.clone());
        metadata.created_at = Some(now.clone());
        metadata.last_altered = Some(now);
        metadata.last_altered_by = principal.full_name.clone();
        metadata.refresh_completion();
        self.persist_metadata(&metadata, true).await?;

        tracing::info!(report = %key, template = %template.id, "report created");
        Ok(Report::from_parts(metadata, template, field_data))
    }

    /// Merge field data and metadata changes into an existing report.
    pub async fn update_report(
        &self,
        principal: &Principal,
        params: &KeyParams,
        request: UpdateReportRequest,
    ) -> Result<Report, ReportError> {
        let key = params.parse()?;
        let (mut metadata, resolved) = self.load_for_write(principal, &key).await?;
        let Resolved {
            template,
            field_data: current,
        } = resolved;
        check_version(request.expected_version, &current)?;

        let patched = request.metadata.is_some();
        if let Some(patch) = request.metadata {
            apply_patch(&mut metadata, patch, &template)?;
        }

        let mut merged = current.data.clone();
        if let Some(incoming) = request.field_data {
            merged.merge(incoming);
        }
        let content_changed = merged != current.data;

        if !content_changed && !patched {
            tracing::debug!(report = %key, "update carries no changes");
            return Ok(Report::from_parts(metadata, template, current));
        }

        let field_data = if content_changed {
            self.stores
                .content
                .put_field_data(Some(&current.id), merged, Some(current.version))
                .await?
        } else {
            current
        };

        touch(&mut metadata, principal);
        self.persist_metadata(&metadata, content_changed).await?;
        tracing::info!(report = %key, content_changed, "report updated");
        Ok(Report::from_parts(metadata, template, field_data))
    }

    /// Add, edit or delete one entity in a report's field data.
    ///
    /// A change that leaves the document as it was writes nothing.
    pub async fn save_entity_change(
        &self,
        principal: &Principal,
        params: &EntityParams,
        change: EntityChange,
        expected_version: Option<u64>,
    ) -> Result<EntityWriteOutcome, ReportError> {
        let (key, entity_type) = params.parse()?;
        match &change {
            EntityChange::Edit { entity_id, .. } | EntityChange::Delete { entity_id }
                if entity_id.trim().is_empty() =>
            {
                return Err(ReportError::malformed(NO_KEY));
            }
            _ => {}
        }

        let (mut metadata, resolved) = self.load_for_write(principal, &key).await?;
        let Resolved {
            template,
            field_data: current,
        } = resolved;
        if !template.declares_entity_type(&entity_type) {
            return Err(ReportError::malformed(format!(
                "unknown entity type: {entity_type}"
            )));
        }
        check_version(expected_version, &current)?;

        let result = apply_entity_change(&current.data, &entity_type, change)?;
        if !result.changed {
            tracing::debug!(report = %key, %entity_type, entity_id = %result.entity_id, "entity change is a no-op");
            return Ok(EntityWriteOutcome {
                entity_id: result.entity_id,
                changed: false,
                report: Report::from_parts(metadata, template, current),
            });
        }

        let field_data = self
            .stores
            .content
            .put_field_data(Some(&current.id), result.field_data, Some(current.version))
            .await?;

        touch(&mut metadata, principal);
        self.persist_metadata(&metadata, true).await?;
        tracing::info!(report = %key, %entity_type, entity_id = %result.entity_id, "entity saved");
        Ok(EntityWriteOutcome {
            entity_id: result.entity_id,
            changed: true,
            report: Report::from_parts(metadata, template, field_data),
        })
    }

    /// Mark a complete report as submitted.
    pub async fn submit_report(
        &self,
        principal: &Principal,
        params: &KeyParams,
    ) -> Result<Report, ReportError> {
        let key = params.parse()?;
        let (mut metadata, resolved) = self.load_for_write(principal, &key).await?;
        let Resolved {
            template,
            field_data,
        } = resolved;

        if metadata.status == ReportStatus::Submitted && !key.report_type.supports_resubmission() {
            return Err(ReportError::malformed("report has already been submitted"));
        }
        metadata.refresh_completion();
        if !metadata.is_complete {
            return Err(ReportError::malformed("report is not complete"));
        }

        let snapshot_written = key.report_type.supports_resubmission();
        if snapshot_written {
            let snapshot = self
                .stores
                .content
                .put_field_data(None, field_data.data.clone(), None)
                .await?;
            metadata.previous_revisions.push(snapshot.id);
            metadata.submission_count += 1;
        }

        let now = now_rfc3339();
        metadata.status = ReportStatus::Submitted;
        metadata.submitted_by = Some(principal.full_name.clone());
        metadata.submitted_on_date = Some(now.clone());
        if key.report_type.locks_on_submit() {
            metadata.locked = true;
        }
        metadata.last_altered_by = principal.full_name.clone();
        metadata.last_altered = Some(now);
        self.persist_metadata(&metadata, snapshot_written).await?;

        tracing::info!(
            report = %key,
            submission_count = metadata.submission_count,
            locked = metadata.locked,
            "report submitted"
        );
        Ok(Report::from_parts(metadata, template, field_data))
    }

    /// Unlock a locked report so it can be edited and resubmitted.
    pub async fn release_report(
        &self,
        principal: &Principal,
        params: &KeyParams,
    ) -> Result<Report, ReportError> {
        let key = params.parse()?;
        authorize_override(
            principal,
            &AccessScope::unlocked(key.report_type, &key.state),
        )
        .into_result()?;

        let mut metadata = self.get_metadata(&key).await?;
        if !metadata.locked {
            return Err(ReportError::malformed("report is not locked"));
        }
        authorize_override(
            principal,
            &AccessScope::unlocked(key.report_type, &key.state).with_lock(true),
        )
        .into_result()?;
        let Resolved {
            template,
            field_data,
        } = self.resolve(&metadata).await?;

        metadata.locked = false;
        metadata.status = ReportStatus::InProgress;
        metadata.last_altered_by = principal.full_name.clone();
        metadata.last_altered = Some(now_rfc3339());
        self.persist_metadata(&metadata, false).await?;

        tracing::info!(report = %key, "report released");
        Ok(Report::from_parts(metadata, template, field_data))
    }

    /// Authorize, read metadata, authorize again with its lock flag, then
    /// resolve the report's template and current field data.
    async fn load_for_write(
        &self,
        principal: &Principal,
        key: &ReportKey,
    ) -> Result<(ReportMetadata, Resolved), ReportError> {
        let scope = AccessScope::unlocked(key.report_type, &key.state);
        authorize(principal, &scope, Action::Write).into_result()?;

        let metadata = self.get_metadata(key).await?;
        authorize(principal, &scope.with_lock(metadata.locked), Action::Write).into_result()?;

        let resolved = self.resolve(&metadata).await?;
        Ok((metadata, resolved))
    }

    async fn get_metadata(&self, key: &ReportKey) -> Result<ReportMetadata, ReportError> {
        self.stores
            .metadata
            .get_metadata(key)
            .await?
            .ok_or(ReportError::NotFound)
    }

    async fn persist_metadata(
        &self,
        metadata: &ReportMetadata,
        content_written: bool,
    ) -> Result<(), ReportError> {
        let mut record = metadata.clone();
        record.refresh_completion();
        match self.stores.metadata.put_metadata(record).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if content_written {
                    tracing::warn!(
                        report = %metadata.key(),
                        error = %e,
                        "field data written but metadata update failed"
                    );
                }
                Err(ReportError::StorageFailure(e))
            }
        }
    }
}

/// Fail with Conflict when the caller's version is not the one just read.
fn check_version(expected: Option<u64>, current: &VersionedFieldData) -> Result<(), ReportError> {
    match expected {
        Some(expected_version) if expected_version != current.version => {
            Err(ReportError::Conflict {
                expected_version,
                actual_version: current.version,
            })
        }
        _ => Ok(()),
    }
}

fn apply_patch(
    metadata: &mut ReportMetadata,
    patch: MetadataPatch,
    template: &FormTemplate,
) -> Result<(), ReportError> {
    if let Some(completion) = patch.completion_status {
        let tracked = template.completion_pages();
        if let Some(unknown) = completion.keys().find(|page| !tracked.contains(&page.as_str())) {
            return Err(ReportError::malformed(format!(
                "unknown completion page: {unknown}"
            )));
        }
        metadata.completion_status.extend(completion);
    }
    if let Some(program_name) = patch.program_name {
        metadata.program_name = program_name;
    }
    if let Some(due_date) = patch.due_date {
        metadata.due_date = Some(due_date);
    }
    for (name, value) in patch.extra {
        if RESERVED_METADATA_KEYS.contains(&name.as_str()) {
            tracing::debug!(key = %name, "ignoring reserved metadata key in patch");
            continue;
        }
        metadata.extra.insert(name, value);
    }
    metadata.refresh_completion();
    Ok(())
}

/// Audit fields and the `Not started` to `In progress` transition.
fn touch(metadata: &mut ReportMetadata, principal: &Principal) {
    metadata.last_altered_by = principal.full_name.clone();
    metadata.last_altered = Some(now_rfc3339());
    if metadata.status == ReportStatus::NotStarted && !metadata.locked {
        metadata.status = ReportStatus::InProgress;
    }
}
