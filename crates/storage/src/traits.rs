use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{FieldData, FormTemplate, ReportKey, ReportMetadata, ReportType, VersionedFieldData};

/// The authoritative index of reports: existence, status, completion flags
/// and the pointers into the template and content stores.
///
/// Implementations must be `Send + Sync + 'static` to be shared across
/// request handlers and async task boundaries.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    /// Look up one report's metadata. `Ok(None)` when no record exists.
    async fn get_metadata(&self, key: &ReportKey) -> Result<Option<ReportMetadata>, StorageError>;

    /// All metadata records for one `(report_type, state)` pair, in the
    /// backend's native order.
    async fn query_metadata(
        &self,
        report_type: ReportType,
        state: &str,
    ) -> Result<Vec<ReportMetadata>, StorageError>;

    /// Insert or replace the record at `metadata.key()`.
    async fn put_metadata(&self, metadata: ReportMetadata) -> Result<(), StorageError>;
}

/// Storage for the mutable field-data documents, addressed by field-data id.
///
/// ## Version stamps
///
/// Every stored document carries a monotonic version. `put_field_data`
/// with `expected_version = Some(v)` is a compare-and-swap: when the stored
/// version differs from `v` the write is
/// rejected with [`StorageError::Conflict`] and nothing is written. A
/// compare-and-swap against an id that does not exist fails with
/// [`StorageError::DocumentMissing`]. `expected_version = None` writes
/// unconditionally (last writer wins).
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Read a field-data document. `Ok(None)` when the id does not resolve.
    async fn get_field_data(
        &self,
        field_data_id: &str,
    ) -> Result<Option<VersionedFieldData>, StorageError>;

    /// Write a field-data document.
    ///
    /// With `field_data_id = None` a fresh id is minted, the document is
    /// created at version 0 and `expected_version` is ignored. Returns the
    /// stored id and new version.
    async fn put_field_data(
        &self,
        field_data_id: Option<&str>,
        data: FieldData,
        expected_version: Option<u64>,
    ) -> Result<VersionedFieldData, StorageError>;
}

/// Read-only access to immutable, versioned form templates.
#[async_trait]
pub trait TemplateStore: Send + Sync + 'static {
    /// Resolve a template id. `Ok(None)` when the id does not resolve.
    async fn get_template(&self, form_template_id: &str)
        -> Result<Option<FormTemplate>, StorageError>;
}
