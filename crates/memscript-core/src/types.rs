//! Core types for memscript

use serde::{Deserialize, Serialize};

/// A uniquely-named record with a type label and ordered observation strings.
///
/// Observations keep insertion order and may contain duplicates; the store
/// attaches no meaning to their contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "entityType")]
    pub entity_type: String,
    #[serde(default)]
    pub observations: Vec<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations: Vec::new(),
        }
    }

    pub fn with_observations(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        observations: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            observations,
        }
    }
}

/// A directed, typed edge between two entity names.
///
/// Identity for deletion is the full triple. Endpoints are not required to
/// name existing entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub from: String,
    pub to: String,
    #[serde(rename = "relationType")]
    pub relation_type: String,
}

impl Relation {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation_type: relation_type.into(),
        }
    }
}

/// Snapshot of the whole store: entities keyed by unique name, plus relations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

/// One batch item for `add_observations`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationAddition {
    #[serde(rename = "entityName")]
    pub entity_name: String,
    pub contents: Vec<String>,
}

/// One batch item for `delete_observations`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationDeletion {
    #[serde(rename = "entityName")]
    pub entity_name: String,
    pub observations: Vec<String>,
}

/// Per-entity report of what `add_observations` actually appended.
///
/// Entries whose entity did not exist are omitted entirely, not reported
/// with an empty list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObservationResult {
    #[serde(rename = "entityName")]
    pub entity_name: String,
    #[serde(rename = "addedObservations")]
    pub added_observations: Vec<String>,
}

/// The structured record produced by one script execution.
///
/// `error` is present iff `success` is false. `output` holds every diagnostic
/// line captured before completion, failure, or timeout, in write order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
}

impl ExecutionOutcome {
    pub fn success(output: Vec<String>, elapsed_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(output: Vec<String>, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            output,
            error: Some(error.into()),
            elapsed_ms,
        }
    }
}

/// Transport request: one opaque script plus an optional budget override.
#[derive(Clone, Debug, Deserialize)]
pub struct ExecuteRequest {
    pub script: String,
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

/// Transport response, stable regardless of transport.
pub type ExecuteResponse = ExecutionOutcome;
