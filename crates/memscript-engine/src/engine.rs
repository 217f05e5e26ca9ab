//! The execution engine: fresh context per request, budget enforcement,
//! forced cancellation.
//!
//! Per request: `Idle -> Running -> {Completed, Failed, TimedOut}`. The run
//! permit serializes scripts so exactly one execution owns the store at a
//! time; committed tool calls survive a timeout (no rollback).

use crate::capture::OutputSink;
use crate::eval::Interp;
use crate::parser::parse;
use crate::report::{normalize, RawOutcome};
use memscript_core::{Error, ExecutionOutcome};
use memscript_graph::GraphStore;
use memscript_tools::ToolBinding;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub default_timeout_ms: u64,
    pub max_output_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_lines: 10_000,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
    pub timeout_ms: Option<u64>,
}

pub struct Engine {
    tools: ToolBinding,
    config: EngineConfig,
    run_permit: Mutex<()>,
}

impl Engine {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<dyn GraphStore>, config: EngineConfig) -> Self {
        Self {
            tools: ToolBinding::new(store),
            config,
            run_permit: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one script to completion, failure, or timeout. Never panics the
    /// caller and never leaves the engine unable to serve the next request.
    pub async fn execute(&self, script: &str, options: ExecuteOptions) -> ExecutionOutcome {
        let _running = self.run_permit.lock().await;
        let started = Instant::now();
        let budget_ms = options
            .timeout_ms
            .unwrap_or(self.config.default_timeout_ms);

        let program = match parse(script) {
            Ok(program) => program,
            Err(err) => {
                debug!("script rejected: {}", err);
                return normalize(RawOutcome {
                    result: Err(err),
                    output: Vec::new(),
                    elapsed_ms: elapsed_ms(started),
                });
            }
        };

        let sink = OutputSink::new(self.config.max_output_lines);
        let cancel = CancellationToken::new();
        let deadline = started + Duration::from_millis(budget_ms);
        let interp = Interp::new(
            self.tools.clone(),
            sink.clone(),
            deadline,
            cancel.clone(),
            budget_ms,
        );

        let mut task = tokio::spawn(interp.run(program));
        let result = tokio::select! {
            joined = &mut task => match joined {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(Error::Timeout(budget_ms)),
                Err(err) => Err(Error::Internal(format!("evaluation task failed: {}", err))),
            },
            _ = tokio::time::sleep(Duration::from_millis(budget_ms)) => {
                // Timer won: cancel cooperatively, then force the task down.
                cancel.cancel();
                task.abort();
                warn!("script exceeded {} ms budget, aborted", budget_ms);
                Err(Error::Timeout(budget_ms))
            }
        };

        let outcome = normalize(RawOutcome {
            result,
            output: sink.snapshot(),
            elapsed_ms: elapsed_ms(started),
        });
        debug!(
            "execution finished: success={} lines={} elapsed={}ms",
            outcome.success,
            outcome.output.len(),
            outcome.elapsed_ms
        );
        outcome
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
