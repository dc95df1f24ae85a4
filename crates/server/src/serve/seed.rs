//! Startup seeding of the in-memory stores from a JSON file.
//!
//! ```json
//! {
//!   "templates": [{"id": "...", "reportType": "MCPAR", "pages": [...]}],
//!   "reports": [{"reportType": "MCPAR", "state": "AB", "id": "...",
//!                "formTemplateId": "...", "fieldDataId": "...",
//!                "fieldData": {...}}]
//! }
//! ```

use std::path::{Path, PathBuf};

use mcr_storage::memory::{MemoryContentStore, MemoryMetadataStore, MemoryTemplateStore};
use mcr_storage::{ContentStore, FieldData, FormTemplate, MetadataStore, ReportMetadata, StorageError};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to store seed data: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeedFile {
    #[serde(default)]
    pub(crate) templates: Vec<FormTemplate>,
    #[serde(default)]
    pub(crate) reports: Vec<SeedReport>,
}

/// A metadata record, optionally with the field data it points at.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SeedReport {
    #[serde(default)]
    pub(crate) field_data: Option<FieldData>,
    #[serde(flatten)]
    pub(crate) metadata: ReportMetadata,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) templates: usize,
    pub(crate) reports: usize,
}

pub(crate) async fn load_seed(
    path: &Path,
    metadata: &MemoryMetadataStore,
    content: &MemoryContentStore,
    templates: &MemoryTemplateStore,
) -> Result<SeedSummary, SeedError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let seed: SeedFile = serde_json::from_str(&text).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    apply_seed(seed, metadata, content, templates).await
}

pub(crate) async fn apply_seed(
    seed: SeedFile,
    metadata: &MemoryMetadataStore,
    content: &MemoryContentStore,
    templates: &MemoryTemplateStore,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    for template in seed.templates {
        let id = template.id.clone();
        if templates.insert(template).await {
            summary.templates += 1;
        } else {
            tracing::warn!(template = %id, "duplicate template id in seed, keeping the first");
        }
    }

    for SeedReport {
        field_data,
        metadata: mut record,
    } in seed.reports
    {
        if let Some(data) = field_data {
            let stored = content
                .put_field_data(record.field_data_id.as_deref(), data, None)
                .await?;
            record.field_data_id = Some(stored.id);
        }
        record.refresh_completion();
        metadata.put_metadata(record).await?;
        summary.reports += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcr_storage::{ReportKey, ReportType, TemplateStore};
    use serde_json::json;

    #[tokio::test]
    async fn seed_populates_all_three_stores() {
        let seed: SeedFile = serde_json::from_value(json!({
            "templates": [
                {"id": "t1", "reportType": "MCPAR", "pages": [{"id": "step-one"}]},
                {"id": "t1", "pages": []}
            ],
            "reports": [
                {
                    "reportType": "MCPAR",
                    "state": "AB",
                    "id": "r1",
                    "formTemplateId": "t1",
                    "fieldDataId": "fd1",
                    "completionStatus": {"step-one": true},
                    "reportingPeriodStartDate": "2026-01-01",
                    "fieldData": {"programName": "p"}
                },
                {
                    "reportType": "MCPAR",
                    "state": "AB",
                    "id": "r2",
                    "formTemplateId": "t1",
                    "fieldData": {}
                }
            ]
        }))
        .unwrap();

        let metadata = MemoryMetadataStore::new();
        let content = MemoryContentStore::new();
        let templates = MemoryTemplateStore::new();
        let summary = apply_seed(seed, &metadata, &content, &templates)
            .await
            .unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                templates: 1,
                reports: 2
            }
        );

        assert!(templates.get_template("t1").await.unwrap().is_some());
        let r1 = metadata
            .get_metadata(&ReportKey::new(ReportType::Mcpar, "AB", "r1"))
            .await
            .unwrap()
            .unwrap();
        assert!(r1.is_complete);
        assert!(!r1.extra.contains_key("fieldData"));
        assert_eq!(r1.extra["reportingPeriodStartDate"], "2026-01-01");
        let fd = content.get_field_data("fd1").await.unwrap().unwrap();
        assert_eq!(fd.data.get("programName"), Some(&json!("p")));

        let r2 = metadata
            .get_metadata(&ReportKey::new(ReportType::Mcpar, "AB", "r2"))
            .await
            .unwrap()
            .unwrap();
        let minted = r2.field_data_id.unwrap();
        assert!(content.get_field_data(&minted).await.unwrap().is_some());
    }
}
