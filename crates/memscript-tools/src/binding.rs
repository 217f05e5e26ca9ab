//! Closed tool dispatch over the graph capability trait.

use memscript_core::{
    Entity, Error, ObservationAddition, ObservationDeletion, Relation, Result,
};
use memscript_graph::GraphStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// The complete tool surface, one variant per store operation.
///
/// Adding a capability means adding a variant here; the compiler then points
/// at every match that needs a new arm. There is no string-keyed fallthrough.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolOp {
    ReadGraph,
    CreateEntities,
    CreateRelations,
    AddObservations,
    DeleteEntities,
    DeleteObservations,
    DeleteRelations,
    SearchNodes,
    OpenNodes,
}

impl ToolOp {
    /// Resolve a script-level name. `None` means the script asked for a
    /// capability that does not exist; the engine reports that as a failure.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "read_graph" => Some(Self::ReadGraph),
            "create_entities" => Some(Self::CreateEntities),
            "create_relations" => Some(Self::CreateRelations),
            "add_observations" => Some(Self::AddObservations),
            "delete_entities" => Some(Self::DeleteEntities),
            "delete_observations" => Some(Self::DeleteObservations),
            "delete_relations" => Some(Self::DeleteRelations),
            "search_nodes" => Some(Self::SearchNodes),
            "open_nodes" => Some(Self::OpenNodes),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadGraph => "read_graph",
            Self::CreateEntities => "create_entities",
            Self::CreateRelations => "create_relations",
            Self::AddObservations => "add_observations",
            Self::DeleteEntities => "delete_entities",
            Self::DeleteObservations => "delete_observations",
            Self::DeleteRelations => "delete_relations",
            Self::SearchNodes => "search_nodes",
            Self::OpenNodes => "open_nodes",
        }
    }

    /// Every capability the binding layer exposes, in a stable order.
    pub fn all() -> &'static [ToolOp] {
        &[
            Self::ReadGraph,
            Self::CreateEntities,
            Self::CreateRelations,
            Self::AddObservations,
            Self::DeleteEntities,
            Self::DeleteObservations,
            Self::DeleteRelations,
            Self::SearchNodes,
            Self::OpenNodes,
        ]
    }

    /// Number of arguments the script must pass (`read_graph` takes none,
    /// everything else exactly one JSON value).
    pub fn arity(&self) -> usize {
        match self {
            Self::ReadGraph => 0,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ToolOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Routes tool calls to whichever `GraphStore` backend is wired in. Scripts
/// see plain JSON on both sides and cannot tell backends apart.
#[derive(Clone)]
pub struct ToolBinding {
    store: Arc<dyn GraphStore>,
}

impl ToolBinding {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Invoke one capability with the script's arguments.
    pub async fn call(&self, op: ToolOp, args: &[Value]) -> Result<Value> {
        if args.len() != op.arity() {
            return Err(Error::tool_argument(
                op.name(),
                format!("expected {} argument(s), got {}", op.arity(), args.len()),
            ));
        }
        debug!("tool call: {}", op);

        match op {
            ToolOp::ReadGraph => to_json(self.store.read_graph().await?),
            ToolOp::CreateEntities => {
                let entities: Vec<Entity> = decode(op, &args[0])?;
                to_json(self.store.create_entities(entities).await?)
            }
            ToolOp::CreateRelations => {
                let relations: Vec<Relation> = decode(op, &args[0])?;
                to_json(self.store.create_relations(relations).await?)
            }
            ToolOp::AddObservations => {
                let additions: Vec<ObservationAddition> = decode(op, &args[0])?;
                to_json(self.store.add_observations(additions).await?)
            }
            ToolOp::DeleteEntities => {
                let names: Vec<String> = decode(op, &args[0])?;
                self.store.delete_entities(names).await?;
                Ok(ack())
            }
            ToolOp::DeleteObservations => {
                let deletions: Vec<ObservationDeletion> = decode(op, &args[0])?;
                self.store.delete_observations(deletions).await?;
                Ok(ack())
            }
            ToolOp::DeleteRelations => {
                let relations: Vec<Relation> = decode(op, &args[0])?;
                self.store.delete_relations(relations).await?;
                Ok(ack())
            }
            ToolOp::SearchNodes => {
                let query: String = decode(op, &args[0])?;
                to_json(self.store.search_nodes(query).await?)
            }
            ToolOp::OpenNodes => {
                let names: Vec<String> = decode(op, &args[0])?;
                to_json(self.store.open_nodes(names).await?)
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(op: ToolOp, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::tool_argument(op.name(), e.to_string()))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn ack() -> Value {
    serde_json::json!({ "ok": true })
}
