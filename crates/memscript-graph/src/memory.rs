//! The async capability surface over the store, and its in-memory backend.
//!
//! `GraphStore` is the only way anything outside this crate reaches the
//! graph. The binding layer holds an `Arc<dyn GraphStore>` and cannot tell
//! whether it is talking to `MemoryStore` or an out-of-process backend; both
//! expose the same nine capabilities with the same behavior.

use crate::store::Store;
use memscript_core::{
    Entity, Graph, ObservationAddition, ObservationDeletion, ObservationResult, Relation, Result,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The nine graph capabilities. Plain data in, plain data out; no method
/// hands back anything that could bypass the store's invariants.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    async fn read_graph(&self) -> Result<Graph>;
    async fn create_entities(&self, entities: Vec<Entity>) -> Result<Vec<Entity>>;
    async fn create_relations(&self, relations: Vec<Relation>) -> Result<Vec<Relation>>;
    async fn add_observations(
        &self,
        additions: Vec<ObservationAddition>,
    ) -> Result<Vec<ObservationResult>>;
    async fn delete_entities(&self, names: Vec<String>) -> Result<()>;
    async fn delete_observations(&self, deletions: Vec<ObservationDeletion>) -> Result<()>;
    async fn delete_relations(&self, relations: Vec<Relation>) -> Result<()>;
    async fn search_nodes(&self, query: String) -> Result<Vec<Entity>>;
    async fn open_nodes(&self, names: Vec<String>) -> Result<Vec<Entity>>;
}

/// In-memory backend. `RwLock` keeps the snapshot consistent even if a
/// future caller runs executions concurrently; reads share, writes exclude.
pub struct MemoryStore {
    inner: RwLock<Store>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Store::new()),
        }
    }

    pub fn with_graph(graph: Graph) -> Self {
        Self {
            inner: RwLock::new(Store::with_graph(graph)),
        }
    }

    pub fn shared(self) -> Arc<dyn GraphStore> {
        Arc::new(self)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn read_graph(&self) -> Result<Graph> {
        Ok(self.inner.read().await.read_graph())
    }

    async fn create_entities(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        Ok(self.inner.write().await.create_entities(entities))
    }

    async fn create_relations(&self, relations: Vec<Relation>) -> Result<Vec<Relation>> {
        Ok(self.inner.write().await.create_relations(relations))
    }

    async fn add_observations(
        &self,
        additions: Vec<ObservationAddition>,
    ) -> Result<Vec<ObservationResult>> {
        Ok(self.inner.write().await.add_observations(additions))
    }

    async fn delete_entities(&self, names: Vec<String>) -> Result<()> {
        self.inner.write().await.delete_entities(names);
        Ok(())
    }

    async fn delete_observations(&self, deletions: Vec<ObservationDeletion>) -> Result<()> {
        self.inner.write().await.delete_observations(deletions);
        Ok(())
    }

    async fn delete_relations(&self, relations: Vec<Relation>) -> Result<()> {
        self.inner.write().await.delete_relations(relations);
        Ok(())
    }

    async fn search_nodes(&self, query: String) -> Result<Vec<Entity>> {
        Ok(self.inner.read().await.search_nodes(&query))
    }

    async fn open_nodes(&self, names: Vec<String>) -> Result<Vec<Entity>> {
        Ok(self.inner.read().await.open_nodes(&names))
    }
}
