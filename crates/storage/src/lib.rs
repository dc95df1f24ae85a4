pub mod conformance;
mod error;
mod id;
pub mod memory;
mod record;
mod traits;

pub use error::{DocumentKind, StorageError};
pub use id::{generate_id, generate_id_with, ID_LENGTH};
pub use record::{
    entity_id, is_complete, DueDate, FieldData, FieldSpec, FormTemplate, ReportKey,
    ReportMetadata, ReportStatus, ReportType, TemplatePage, UnknownReportType, VersionedFieldData,
};
pub use traits::{ContentStore, MetadataStore, TemplateStore};
