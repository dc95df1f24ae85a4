//! Runs the store conformance suite against the in-memory backends.

use mcr_storage::conformance::run_conformance_suite;
use mcr_storage::memory::{MemoryContentStore, MemoryMetadataStore, MemoryTemplateStore};

#[tokio::test]
async fn memory_backends_pass_conformance() {
    let report = run_conformance_suite(
        || async { MemoryMetadataStore::new() },
        || async { MemoryContentStore::new() },
        |templates| async move { MemoryTemplateStore::with_templates(templates) },
    )
    .await;
    assert!(report.failed == 0, "{report}");
    assert!(report.total > 0);
}
