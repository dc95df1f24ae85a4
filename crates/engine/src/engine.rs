use std::sync::Arc;

use mcr_storage::{ContentStore, MetadataStore, TemplateStore};

/// The three independent backing stores of the report engine.
///
/// Metadata and content are separate transactional domains: no operation
/// here assumes a write can span both.
#[derive(Clone)]
pub struct Stores {
    pub metadata: Arc<dyn MetadataStore>,
    pub content: Arc<dyn ContentStore>,
    pub templates: Arc<dyn TemplateStore>,
}

/// Entry point for every report read and write.
///
/// Holds no mutable state of its own; each call is an independent unit of
/// work against the stores. Cheap to clone and share across handlers.
#[derive(Clone)]
pub struct ReportEngine {
    pub(crate) stores: Stores,
}

impl ReportEngine {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        content: Arc<dyn ContentStore>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            stores: Stores {
                metadata,
                content,
                templates,
            },
        }
    }
}

/// Current UTC time as an RFC 3339 string.
pub(crate) fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
