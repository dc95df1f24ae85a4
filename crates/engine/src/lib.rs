//! Report data engine.
//!
//! Reads assemble a report from its metadata record, form template and
//! field-data document. Writes go through the access guard, the entity
//! mutator and the stores in a fixed order: content first, then metadata.
//! Every operation takes the acting [`Principal`] explicitly.

pub mod access;
pub mod assemble;
mod engine;
pub mod entity;
pub mod error;
pub mod principal;
pub mod request;
pub mod write;

pub use access::{authorize, authorize_override, AccessScope, Action, Decision, DenialReason};
pub use assemble::{Report, ReportSummary};
pub use engine::{ReportEngine, Stores};
pub use entity::{apply_entity_change, EntityChange, EntityChangeResult, EntityError};
pub use error::{ClientErrorKind, ErrorClass, ReportError};
pub use principal::{Principal, Role, UnknownRole};
pub use request::{EntityParams, KeyParams, ScopeParams};
pub use write::{CreateReportRequest, EntityWriteOutcome, MetadataPatch, UpdateReportRequest};
