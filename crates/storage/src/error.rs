/// All errors that can be returned by a store adapter implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency conflict: the field-data document was written
    /// by someone else since `expected_version` was read.
    #[error(
        "concurrent conflict on field data {field_data_id}: expected version {expected_version}, found {actual_version}"
    )]
    Conflict {
        field_data_id: String,
        expected_version: u64,
        actual_version: u64,
    },

    /// The backend reported that a referenced document does not exist
    /// (e.g. an object-store "no such key" on a conditional write).
    #[error("{kind} document not found: {id}")]
    DocumentMissing { kind: DocumentKind, id: String },

    /// A stored document could not be decoded.
    #[error("corrupt {kind} document {id}: {message}")]
    Corrupt {
        kind: DocumentKind,
        id: String,
        message: String,
    },

    /// A backend-specific storage error (connection, timeout, throttling, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Which of the three stores a document belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Metadata,
    FieldData,
    FormTemplate,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentKind::Metadata => "metadata",
            DocumentKind::FieldData => "field data",
            DocumentKind::FormTemplate => "form template",
        };
        f.write_str(name)
    }
}
