//! Bounded row buffering between the row builder and the load client

use crate::row::OutputRow;

/// Capacity-bounded buffer. `push` reports when the configured capacity
/// is reached; `drain` is used both at capacity and for the final
/// partial batch at end-of-stream. The accumulator itself never drops a
/// row.
#[derive(Debug)]
pub struct BatchAccumulator {
    rows: Vec<OutputRow>,
    capacity: usize,
}

impl BatchAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a row; returns true once the batch is full.
    pub fn push(&mut self, row: OutputRow) -> bool {
        self.rows.push(row);
        self.rows.len() >= self.capacity
    }

    /// Return and clear the current contents.
    pub fn drain(&mut self) -> Vec<OutputRow> {
        std::mem::replace(&mut self.rows, Vec::with_capacity(self.capacity))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
