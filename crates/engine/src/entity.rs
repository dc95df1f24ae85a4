//! Entity mutator: add, edit or delete one element of an entity array
//! inside a field-data document.
//!
//! Pure: takes a document and returns a new one. Every other key of the
//! document, and every other element of the targeted array, is carried over
//! untouched and in its original position. Persisting the result is the
//! write path's job.

use mcr_storage::{entity_id, generate_id_with, FieldData};
use rand::Rng;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One change to an entity array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EntityChange {
    /// Append a new entity with a freshly generated id.
    Add { fields: Map<String, Value> },
    /// Replace the non-id fields of an existing entity.
    #[serde(rename_all = "camelCase")]
    Edit {
        entity_id: String,
        fields: Map<String, Value>,
    },
    /// Remove an entity. Removing an unknown id is not an error.
    #[serde(rename_all = "camelCase")]
    Delete { entity_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityChangeResult {
    pub field_data: FieldData,
    /// The added, edited or deleted entity's id.
    pub entity_id: String,
    /// `false` when the document is unchanged and nothing needs persisting.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    #[error("field data key '{entity_type}' holds a non-array value")]
    NotAnArray { entity_type: String },

    #[error("entity {entity_id} not found in {entity_type}")]
    EntityNotFound {
        entity_type: String,
        entity_id: String,
    },
}

/// Apply `change` to the `entity_type` array of `field_data`.
pub fn apply_entity_change(
    field_data: &FieldData,
    entity_type: &str,
    change: EntityChange,
) -> Result<EntityChangeResult, EntityError> {
    apply_entity_change_with(&mut rand::thread_rng(), field_data, entity_type, change)
}

/// [`apply_entity_change`] with an explicit random source for new ids.
pub fn apply_entity_change_with<R: Rng + ?Sized>(
    rng: &mut R,
    field_data: &FieldData,
    entity_type: &str,
    change: EntityChange,
) -> Result<EntityChangeResult, EntityError> {
    let current = match field_data.get(entity_type) {
        None | Some(Value::Null) => None,
        Some(Value::Array(entities)) => Some(entities),
        Some(_) => {
            return Err(EntityError::NotAnArray {
                entity_type: entity_type.to_string(),
            })
        }
    };

    match change {
        EntityChange::Add { fields } => {
            let existing = current.map(Vec::as_slice).unwrap_or_default();
            let id = fresh_id(rng, existing);
            let mut entities = existing.to_vec();
            entities.push(build_entity(&id, fields));
            Ok(EntityChangeResult {
                field_data: with_entities(field_data, entity_type, entities),
                entity_id: id,
                changed: true,
            })
        }

        EntityChange::Edit {
            entity_id: target,
            fields,
        } => {
            let not_found = || EntityError::EntityNotFound {
                entity_type: entity_type.to_string(),
                entity_id: target.clone(),
            };
            let entities = current.ok_or_else(not_found)?;
            let index = entities
                .iter()
                .position(|e| entity_id(e) == Some(target.as_str()))
                .ok_or_else(not_found)?;

            let updated = build_entity(&target, fields);
            if entities[index] == updated {
                return Ok(EntityChangeResult {
                    field_data: field_data.clone(),
                    entity_id: target,
                    changed: false,
                });
            }

            let mut entities = entities.clone();
            entities[index] = updated;
            Ok(EntityChangeResult {
                field_data: with_entities(field_data, entity_type, entities),
                entity_id: target,
                changed: true,
            })
        }

        EntityChange::Delete { entity_id: target } => {
            let Some(entities) = current else {
                return Ok(unchanged(field_data, target));
            };
            let remaining: Vec<Value> = entities
                .iter()
                .filter(|e| entity_id(e) != Some(target.as_str()))
                .cloned()
                .collect();
            if remaining.len() == entities.len() {
                return Ok(unchanged(field_data, target));
            }
            Ok(EntityChangeResult {
                field_data: with_entities(field_data, entity_type, remaining),
                entity_id: target,
                changed: true,
            })
        }
    }
}

/// An id not used by any entity in `existing`.
fn fresh_id<R: Rng + ?Sized>(rng: &mut R, existing: &[Value]) -> String {
    loop {
        let id = generate_id_with(rng);
        if !existing.iter().any(|e| entity_id(e) == Some(id.as_str())) {
            return id;
        }
    }
}

/// `{"id": id, ...fields}`. A caller-supplied `id` in `fields` is dropped.
fn build_entity(id: &str, mut fields: Map<String, Value>) -> Value {
    fields.remove("id");
    let mut entity = Map::with_capacity(fields.len() + 1);
    entity.insert("id".to_string(), Value::String(id.to_string()));
    entity.extend(fields);
    Value::Object(entity)
}

fn with_entities(field_data: &FieldData, entity_type: &str, entities: Vec<Value>) -> FieldData {
    let mut next = field_data.clone();
    next.insert(entity_type, Value::Array(entities));
    next
}

fn unchanged(field_data: &FieldData, entity_id: String) -> EntityChangeResult {
    EntityChangeResult {
        field_data: field_data.clone(),
        entity_id,
        changed: false,
    }
}
