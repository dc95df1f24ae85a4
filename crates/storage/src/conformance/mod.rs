//! Conformance test suite for store adapter implementations.
//!
//! A backend-agnostic suite that any [`MetadataStore`], [`ContentStore`] and
//! [`TemplateStore`] implementation can run to verify it honours the
//! contracts the report engine relies on:
//!
//! - **Metadata**: get/put round trip, absent keys, query scoping by
//!   `(report_type, state)`, replacement on put
//! - **Content**: minting, version stamps, compare-and-swap conflicts,
//!   unconditional writes, absent ids
//! - **Templates**: resolution and absent ids
//! - **Concurrency**: racing compare-and-swap writers, exactly one wins
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with one factory per store.
//! Each factory creates a fresh, empty instance for every test; the template
//! factory receives the templates the instance must serve.
//!
//! ```ignore
//! use mcr_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn dynamo_conformance() {
//!     let report = run_conformance_suite(
//!         || async { dynamo_metadata().await },
//!         || async { s3_content().await },
//!         |templates| async move { s3_templates(templates).await },
//!     )
//!     .await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod content;
mod metadata;
mod template;

use std::fmt;
use std::future::Future;

use serde_json::json;

use crate::record::{FieldData, FormTemplate, ReportKey, ReportMetadata, ReportType};
use crate::{ContentStore, MetadataStore, TemplateStore};

/// Outcome of one conformance case.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Store under test: "metadata", "content", "template" or "concurrent".
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Why the case failed; `None` on success.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: result.is_ok(),
            message: result.err(),
        }
    }
}

/// All case outcomes of one suite run, with tallies.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl ConformanceReport {
    fn from_results(results: Vec<TestResult>) -> Self {
        let failed = results.iter().filter(|r| !r.passed).count();
        Self {
            passed: results.len() - failed,
            failed,
            total: results.len(),
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "store conformance: {} of {} cases passed", self.passed, self.total)?;
        for r in self.failures() {
            let why = r.message.as_deref().unwrap_or("no detail");
            writeln!(f, "  {}::{} failed: {}", r.category, r.name, why)?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against a set of store backends.
pub async fn run_conformance_suite<M, FM, FutM, C, FC, FutC, T, FT, FutT>(
    metadata_factory: FM,
    content_factory: FC,
    template_factory: FT,
) -> ConformanceReport
where
    M: MetadataStore,
    FM: Fn() -> FutM,
    FutM: Future<Output = M>,
    C: ContentStore,
    FC: Fn() -> FutC,
    FutC: Future<Output = C>,
    T: TemplateStore,
    FT: Fn(Vec<FormTemplate>) -> FutT,
    FutT: Future<Output = T>,
{
    let mut results = Vec::new();

    results.extend(metadata::run_metadata_tests(&metadata_factory).await);
    results.extend(content::run_content_tests(&content_factory).await);
    results.extend(template::run_template_tests(&template_factory).await);
    results.extend(concurrent::run_concurrent_tests(&content_factory).await);

    ConformanceReport::from_results(results)
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_metadata(report_type: ReportType, state: &str, id: &str) -> ReportMetadata {
    let mut md = ReportMetadata::new(ReportKey::new(report_type, state, id));
    md.form_template_id = Some(format!("template-{id}"));
    md.field_data_id = Some(format!("field-data-{id}"));
    md.program_name = "testProgram".to_string();
    md.last_altered_by = "Thelonious States".to_string();
    md.completion_status.insert("step-one".to_string(), false);
    md
}

fn make_field_data(program_name: &str) -> FieldData {
    let mut data = FieldData::new();
    data.insert("programName", json!(program_name));
    data.insert(
        "accessMeasures",
        json!([{"id": "measure-1", "accessMeasure_standardDescription": "mock"}]),
    );
    data
}

fn make_template(id: &str) -> FormTemplate {
    FormTemplate {
        id: id.to_string(),
        version: "MCPAR_2024-01".to_string(),
        report_type: Some(ReportType::Mcpar),
        pages: Vec::new(),
        extra: serde_json::Map::new(),
    }
}
