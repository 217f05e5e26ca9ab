//! End-to-end engine tests: scripts against a real in-memory store.

use memscript_core::Entity;
use memscript_engine::{Engine, EngineConfig, ExecuteOptions};
use memscript_graph::{GraphStore, MemoryStore};
use std::sync::Arc;

fn engine() -> (Arc<MemoryStore>, Engine) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone());
    (store, engine)
}

fn opts(timeout_ms: u64) -> ExecuteOptions {
    ExecuteOptions {
        timeout_ms: Some(timeout_ms),
    }
}

// ===========================================================================
// Success path and output ordering
// ===========================================================================

#[tokio::test]
async fn logs_arrive_in_write_order_across_tool_calls() {
    let (_, engine) = engine();
    let script = r#"
        log("one");
        graph.create_entities([{ name: "a", entityType: "t" }]);
        log("two");
        graph.create_entities([{ name: "b", entityType: "t" }]);
        log("three");
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec!["one", "two", "three"]);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn log_renders_strings_bare_and_values_as_json() {
    let (_, engine) = engine();
    let outcome = engine
        .execute(r#"log("n =", 3, [1], { k: true });"#, ExecuteOptions::default())
        .await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec![r#"n = 3 [1] {"k":true}"#]);
}

#[tokio::test]
async fn batch_update_scenario() {
    // 50 entities, script touches 5 of them through open_nodes + add_observations
    let store = Arc::new(MemoryStore::new());
    let seed: Vec<Entity> = (1..=50)
        .map(|i| {
            Entity::with_observations(
                format!("Record_{:03}", i),
                "record",
                vec!["count: 0".to_string()],
            )
        })
        .collect();
    store.create_entities(seed).await.unwrap();
    let engine = Engine::new(store.clone());

    let script = r#"
        let names = ["Record_003", "Record_010", "Record_021", "Record_034", "Record_048"];
        for name in names {
            let found = graph.open_nodes([name]);
            if len(found) == 1 {
                graph.add_observations([{ entityName: name, contents: ["count: 1"] }]);
            }
        }
        log("updated " + str(len(names)));
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec!["updated 5"]);
    // Store access dominates; whole run stays far below a second
    assert!(outcome.elapsed_ms < 1000, "took {} ms", outcome.elapsed_ms);

    let graph = store.read_graph().await.unwrap();
    let updated: Vec<_> = graph
        .entities
        .iter()
        .filter(|e| e.observations == vec!["count: 0", "count: 1"])
        .collect();
    assert_eq!(updated.len(), 5);
    let untouched = graph
        .entities
        .iter()
        .filter(|e| e.observations == vec!["count: 0"])
        .count();
    assert_eq!(untouched, 45);
}

#[tokio::test]
async fn sequential_tool_calls_observe_program_order() {
    let (store, engine) = engine();
    let script = r#"
        graph.create_entities([{ name: "x", entityType: "t" }]);
        graph.delete_entities(["x"]);
        let g = graph.read_graph();
        log(len(g.entities));
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec!["0"]);
    assert!(store.read_graph().await.unwrap().entities.is_empty());
}

// ===========================================================================
// Timeout
// ===========================================================================

#[tokio::test]
async fn infinite_loop_hits_the_budget() {
    let (_, engine) = engine();
    let outcome = engine.execute("while true { let x = 1; }", opts(50)).await;
    assert!(!outcome.success);
    let err = outcome.error.unwrap();
    assert!(err.contains("timed out"), "{}", err);
    assert!(outcome.elapsed_ms >= 50);
    // Approximately the budget, not drastically larger
    assert!(outcome.elapsed_ms < 2000, "took {} ms", outcome.elapsed_ms);
}

#[tokio::test]
async fn huge_range_call_hits_the_budget() {
    // range() builds its array without suspending; the deadline must still
    // cut it off instead of letting the allocation run to completion
    let (_, engine) = engine();
    let outcome = engine.execute("let x = range(20000000);", opts(50)).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("timed out"));
    assert!(outcome.elapsed_ms >= 50);
    assert!(outcome.elapsed_ms < 2000, "took {} ms", outcome.elapsed_ms);
}

#[tokio::test]
async fn timeout_returns_partial_output() {
    let (_, engine) = engine();
    let script = r#"
        log("before");
        sleep(10000);
        log("after");
    "#;
    let outcome = engine.execute(script, opts(50)).await;
    assert!(!outcome.success);
    assert_eq!(outcome.output, vec!["before"]);
    assert!(outcome.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn mutations_before_timeout_survive() {
    let (store, engine) = engine();
    let script = r#"
        graph.create_entities([{ name: "committed", entityType: "t" }]);
        sleep(10000);
    "#;
    let outcome = engine.execute(script, opts(50)).await;
    assert!(!outcome.success);
    let graph = store.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 1);
    assert_eq!(graph.entities[0].name, "committed");
}

#[tokio::test]
async fn engine_serves_next_request_after_timeout() {
    let (_, engine) = engine();
    let timed_out = engine.execute("while true { let x = 1; }", opts(50)).await;
    assert!(!timed_out.success);
    let next = engine.execute(r#"log("alive");"#, ExecuteOptions::default()).await;
    assert!(next.success);
    assert_eq!(next.output, vec!["alive"]);
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn undefined_name_fails_with_description() {
    let (_, engine) = engine();
    let outcome = engine.execute("log(mystery);", ExecuteOptions::default()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("mystery"));
}

#[tokio::test]
async fn unknown_capability_fails_not_silently() {
    let (_, engine) = engine();
    let outcome = engine
        .execute("read_file(\"/etc/passwd\");", ExecuteOptions::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("read_file"));

    let outcome = engine
        .execute("graph.drop_everything();", ExecuteOptions::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("drop_everything"));
}

#[tokio::test]
async fn failure_keeps_output_written_before_it() {
    let (_, engine) = engine();
    let script = r#"
        log("first");
        log("second");
        boom();
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(!outcome.success);
    assert_eq!(outcome.output, vec!["first", "second"]);
}

#[tokio::test]
async fn parse_error_is_a_failed_outcome() {
    let (_, engine) = engine();
    let outcome = engine.execute("let = ;", ExecuteOptions::default()).await;
    assert!(!outcome.success);
    assert!(outcome.output.is_empty());
    assert!(outcome.error.unwrap().contains("parse error"));
}

#[tokio::test]
async fn errors_name_the_source_line() {
    let (_, engine) = engine();
    let outcome = engine
        .execute("log(\"ok\");\nlet x = 1 + \"?\" * 2;", ExecuteOptions::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("line 2"));
}

// ===========================================================================
// Language behavior
// ===========================================================================

#[tokio::test]
async fn control_flow_and_builtins() {
    let (_, engine) = engine();
    let script = r#"
        let total = 0;
        for i in range(5) {
            if i % 2 == 0 {
                total = total + i;
            }
        }
        log(total);
        let words = split("a,b,c", ",");
        log(join(words, "-"));
        log(upper("ok"), lower("OK"));
        log(contains([1, 2, 3], 2), contains("teapot", "tea"));
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec!["6", "a-b-c", "OK ok", "true true"]);
}

#[tokio::test]
async fn nested_data_access_and_assignment() {
    let (_, engine) = engine();
    let script = r#"
        let e = { name: "a", tags: ["x"] };
        e.tags = push(e.tags, "y");
        e["name"] = "b";
        log(e.name, e.tags[1]);
        log(json_str(json_parse("{\"n\": 1}")));
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec!["b y", r#"{"n":1}"#]);
}

#[tokio::test]
async fn fractional_index_is_an_error_not_a_truncation() {
    let (_, engine) = engine();
    let outcome = engine
        .execute("let xs = [1, 2, 3]; log(xs[1.5]);", ExecuteOptions::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("1.5"));

    let outcome = engine
        .execute("let xs = [1, 2]; xs[0.5] = 9;", ExecuteOptions::default())
        .await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("0.5"));
}

#[tokio::test]
async fn shadowing_the_tool_namespace_is_rejected() {
    let (_, engine) = engine();
    let outcome = engine.execute("let graph = 1;", ExecuteOptions::default()).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("graph"));

    let outcome = engine.execute("let log = 1;", ExecuteOptions::default()).await;
    assert!(!outcome.success);
}

#[tokio::test]
async fn search_and_open_round_trip_through_script() {
    let (_, engine) = engine();
    let script = r#"
        graph.create_entities([
            { name: "Alice", entityType: "person", observations: ["drinks tea"] },
            { name: "Bob", entityType: "person", observations: [] }
        ]);
        graph.create_relations([{ from: "Alice", to: "Bob", relationType: "knows" }]);
        let hits = graph.search_nodes("TEA");
        log(len(hits), hits[0].name);
        let opened = graph.open_nodes(["Bob", "Ghost"]);
        log(len(opened), opened[0].name);
    "#;
    let outcome = engine.execute(script, ExecuteOptions::default()).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.output, vec!["1 Alice", "1 Bob"]);
}

#[tokio::test]
async fn output_cap_fails_the_script_but_keeps_lines() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::with_config(
        store,
        EngineConfig {
            max_output_lines: 3,
            ..EngineConfig::default()
        },
    );
    let outcome = engine
        .execute("for i in range(10) { log(i); }", ExecuteOptions::default())
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.output.len(), 3);
    assert!(outcome.error.unwrap().contains("output limit"));
}
