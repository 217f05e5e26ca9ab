//! The synchronous storage layer: nine operations over one in-memory graph.

use memscript_core::{
    Entity, Graph, ObservationAddition, ObservationDeletion, ObservationResult, Relation,
};

/// Owns the process-wide graph. All mutation flows through these methods.
///
/// Entities keep creation order (the snapshot lists them in the order first
/// created); relations keep append order and allow duplicates.
#[derive(Debug, Default)]
pub struct Store {
    graph: Graph,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an externally loaded graph (the startup loader uses this).
    pub fn with_graph(graph: Graph) -> Self {
        Self { graph }
    }

    /// Snapshot of all entities and relations. Never fails.
    pub fn read_graph(&self) -> Graph {
        self.graph.clone()
    }

    pub fn entity_count(&self) -> usize {
        self.graph.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.relations.len()
    }

    /// Insert entities; an existing entity with the same name is replaced
    /// wholesale (last write wins, observations not merged).
    pub fn create_entities(&mut self, entities: Vec<Entity>) -> Vec<Entity> {
        for entity in &entities {
            match self
                .graph
                .entities
                .iter_mut()
                .find(|e| e.name == entity.name)
            {
                Some(existing) => *existing = entity.clone(),
                None => self.graph.entities.push(entity.clone()),
            }
        }
        entities
    }

    /// Append relations unconditionally. No referential-integrity check and
    /// no dedup: a relation may name entities that do not exist yet, and the
    /// same triple may appear more than once.
    pub fn create_relations(&mut self, relations: Vec<Relation>) -> Vec<Relation> {
        self.graph.relations.extend(relations.iter().cloned());
        relations
    }

    /// Append observation strings to named entities. Unknown entity names are
    /// skipped and omitted from the result, not errors.
    pub fn add_observations(&mut self, additions: Vec<ObservationAddition>) -> Vec<ObservationResult> {
        let mut results = Vec::new();
        for addition in additions {
            let Some(entity) = self
                .graph
                .entities
                .iter_mut()
                .find(|e| e.name == addition.entity_name)
            else {
                continue;
            };
            entity.observations.extend(addition.contents.iter().cloned());
            results.push(ObservationResult {
                entity_name: addition.entity_name,
                added_observations: addition.contents,
            });
        }
        results
    }

    /// Remove named entities and cascade to any relation touching them.
    /// Absent names are a no-op.
    pub fn delete_entities(&mut self, names: Vec<String>) {
        for name in &names {
            self.graph.entities.retain(|e| &e.name != name);
            self.graph
                .relations
                .retain(|r| &r.from != name && &r.to != name);
        }
    }

    /// Remove all occurrences of each listed observation string from the
    /// named entity. Missing entities and missing strings are no-ops.
    pub fn delete_observations(&mut self, deletions: Vec<ObservationDeletion>) {
        for deletion in deletions {
            let Some(entity) = self
                .graph
                .entities
                .iter_mut()
                .find(|e| e.name == deletion.entity_name)
            else {
                continue;
            };
            entity
                .observations
                .retain(|o| !deletion.observations.contains(o));
        }
    }

    /// Remove every relation matching a triple exactly, duplicates included.
    pub fn delete_relations(&mut self, relations: Vec<Relation>) {
        self.graph.relations.retain(|r| !relations.contains(r));
    }

    /// Case-insensitive substring match against name, type, or any
    /// observation. Returns entities only, no relations.
    pub fn search_nodes(&self, query: &str) -> Vec<Entity> {
        let needle = query.to_lowercase();
        self.graph
            .entities
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.entity_type.to_lowercase().contains(&needle)
                    || e.observations
                        .iter()
                        .any(|o| o.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    /// Look up entities by exact name, silently omitting names not found.
    /// Result order follows store order, not request order.
    pub fn open_nodes(&self, names: &[String]) -> Vec<Entity> {
        self.graph
            .entities
            .iter()
            .filter(|e| names.contains(&e.name))
            .cloned()
            .collect()
    }
}
