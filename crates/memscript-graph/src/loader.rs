//! Graph file load/save — populates the store before any execution is served.
//!
//! The file is one JSON document: `{"entities": [...], "relations": [...]}`.
//! A missing file loads as an empty graph so first boot needs no setup step.

use memscript_core::{Error, Graph, Result};
use std::path::Path;
use tracing::info;

pub fn load_graph(path: impl AsRef<Path>) -> Result<Graph> {
    let path = path.as_ref();
    if !path.exists() {
        info!("graph file {:?} not found, starting empty", path);
        return Ok(Graph::default());
    }
    let text = std::fs::read_to_string(path)?;
    let graph: Graph = serde_json::from_str(&text)
        .map_err(|e| Error::GraphFile(format!("{:?}: {}", path, e)))?;
    info!(
        "loaded graph from {:?}: {} entities, {} relations",
        path,
        graph.entities.len(),
        graph.relations.len()
    );
    Ok(graph)
}

pub fn save_graph(path: impl AsRef<Path>, graph: &Graph) -> Result<()> {
    let text = serde_json::to_string_pretty(graph)?;
    std::fs::write(path.as_ref(), text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memscript_core::{Entity, Relation};

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let g = load_graph(dir.path().join("absent.json")).unwrap();
        assert!(g.entities.is_empty());
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let graph = Graph {
            entities: vec![Entity::with_observations("a", "t", vec!["o".into()])],
            relations: vec![Relation::new("a", "b", "knows")],
        };
        save_graph(&path, &graph).unwrap();
        assert_eq!(load_graph(&path).unwrap(), graph);
    }

    #[test]
    fn malformed_file_is_a_graph_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_graph(&path).unwrap_err();
        assert!(matches!(err, Error::GraphFile(_)));
    }
}
