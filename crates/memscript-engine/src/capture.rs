//! Ordered capture of diagnostic writes.
//!
//! The sink lives outside the evaluation task, so lines written before a
//! failure or a forced timeout abort are still there to report. One script
//! means one writer, so append order is the script's write order.

use memscript_core::{Error, Result};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct OutputSink {
    lines: Arc<Mutex<Vec<String>>>,
    max_lines: usize,
}

impl OutputSink {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(Vec::new())),
            max_lines,
        }
    }

    /// Append one captured line. Fails the script once the cap is hit.
    pub fn push(&self, line: String) -> Result<()> {
        let mut lines = self
            .lines
            .lock()
            .map_err(|_| Error::Internal("output sink poisoned".into()))?;
        if lines.len() >= self.max_lines {
            return Err(Error::script(format!(
                "output limit of {} lines exceeded",
                self.max_lines
            )));
        }
        lines.push(line);
        Ok(())
    }

    /// Everything captured so far, in write order.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}
