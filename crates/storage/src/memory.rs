//! In-memory store backends.
//!
//! Used by the server binary (seeded from a JSON file) and by tests. Each
//! store counts reads and writes so callers can assert that an operation
//! did or did not touch storage, and can be switched into a failing mode to
//! simulate backend faults.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{DocumentKind, StorageError};
use crate::id::generate_id;
use crate::record::{
    FieldData, FormTemplate, ReportKey, ReportMetadata, ReportType, VersionedFieldData,
};
use crate::traits::{ContentStore, MetadataStore, TemplateStore};

/// Read/write counters shared by the in-memory stores.
#[derive(Debug, Default)]
pub struct AccessCounter {
    reads: AtomicUsize,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl AccessCounter {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Total calls, reads and writes combined.
    pub fn total(&self) -> usize {
        self.reads() + self.writes()
    }

    /// When set, every subsequent call fails with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn read(&self, what: &str) -> Result<(), StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check(what)
    }

    fn write(&self, what: &str) -> Result<(), StorageError> {
        self.check(what)?;
        self.record_write();
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn check(&self, what: &str) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!("{what}: backend unavailable")));
        }
        Ok(())
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// Metadata records keyed by [`ReportKey`]. Native query order is key order.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<BTreeMap<ReportKey, ReportMetadata>>,
    counter: AccessCounter,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> &AccessCounter {
        &self.counter
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get_metadata(&self, key: &ReportKey) -> Result<Option<ReportMetadata>, StorageError> {
        self.counter.read("get metadata")?;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn query_metadata(
        &self,
        report_type: ReportType,
        state: &str,
    ) -> Result<Vec<ReportMetadata>, StorageError> {
        self.counter.read("query metadata")?;
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|m| m.report_type == report_type && m.state == state)
            .cloned()
            .collect())
    }

    async fn put_metadata(&self, metadata: ReportMetadata) -> Result<(), StorageError> {
        self.counter.write("put metadata")?;
        self.records.write().await.insert(metadata.key(), metadata);
        Ok(())
    }
}

// ── Content ──────────────────────────────────────────────────────────────────

/// Field-data documents keyed by field-data id.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    documents: RwLock<HashMap<String, VersionedFieldData>>,
    counter: AccessCounter,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> &AccessCounter {
        &self.counter
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn get_field_data(
        &self,
        field_data_id: &str,
    ) -> Result<Option<VersionedFieldData>, StorageError> {
        self.counter.read("get field data")?;
        Ok(self.documents.read().await.get(field_data_id).cloned())
    }

    async fn put_field_data(
        &self,
        field_data_id: Option<&str>,
        data: FieldData,
        expected_version: Option<u64>,
    ) -> Result<VersionedFieldData, StorageError> {
        self.counter.check("put field data")?;
        // Hold the write lock across compare and swap.
        let mut documents = self.documents.write().await;

        let id = match field_data_id {
            Some(id) => id.to_string(),
            None => {
                let mut id = generate_id();
                while documents.contains_key(&id) {
                    id = generate_id();
                }
                id
            }
        };

        let version = match (field_data_id, documents.get(&id), expected_version) {
            (None, _, _) => 0,
            (_, Some(current), Some(expected)) if current.version != expected => {
                return Err(StorageError::Conflict {
                    field_data_id: id,
                    expected_version: expected,
                    actual_version: current.version,
                });
            }
            (_, Some(current), _) => current.version + 1,
            (_, None, Some(_)) => {
                return Err(StorageError::DocumentMissing {
                    kind: DocumentKind::FieldData,
                    id,
                });
            }
            (_, None, None) => 0,
        };

        let stored = VersionedFieldData { id, version, data };
        documents.insert(stored.id.clone(), stored.clone());
        self.counter.record_write();
        Ok(stored)
    }
}

// ── Templates ────────────────────────────────────────────────────────────────

/// Form templates keyed by template id. Loading happens outside the
/// read-only [`TemplateStore`] contract.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<HashMap<String, FormTemplate>>,
    counter: AccessCounter,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = FormTemplate>) -> Self {
        let map = templates.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            templates: RwLock::new(map),
            counter: AccessCounter::default(),
        }
    }

    /// Register a template. Returns `false` (and leaves the store unchanged)
    /// when the id is already taken, since templates are immutable.
    pub async fn insert(&self, template: FormTemplate) -> bool {
        let mut templates = self.templates.write().await;
        if templates.contains_key(&template.id) {
            return false;
        }
        templates.insert(template.id.clone(), template);
        true
    }

    pub fn counter(&self) -> &AccessCounter {
        &self.counter
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get_template(
        &self,
        form_template_id: &str,
    ) -> Result<Option<FormTemplate>, StorageError> {
        self.counter.read("get form template")?;
        Ok(self.templates.read().await.get(form_template_id).cloned())
    }
}
