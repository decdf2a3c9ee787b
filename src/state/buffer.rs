//! Record buffer that fills up to a batch trigger.

use serde_json::Value;

/// Ordered records waiting for the next training batch.
///
/// Capacity is reserved to the batch size up front and kept across flushes,
/// so steady-state writes do not reallocate.
#[derive(Debug)]
pub struct BatchBuffer {
    records: Vec<Value>,
    batch_size: usize,
}

impl BatchBuffer {
    pub fn new(batch_size: usize) -> Self {
        Self {
            records: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    /// Append a record. Returns true once the buffer holds a full batch.
    pub fn push(&mut self, record: Value) -> bool {
        self.records.push(record);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.batch_size
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    /// Hand the oldest `batch_size` records to `train` as one array value and
    /// remove them from the buffer.
    ///
    /// The records are gone afterwards whatever `train` returns. Anything past
    /// the first batch stays buffered in order. Returns the number of records
    /// handed over together with `train`'s result.
    pub fn flush<T>(&mut self, train: impl FnOnce(&Value) -> T) -> (usize, T) {
        let rest = if self.records.len() > self.batch_size {
            self.records.split_off(self.batch_size)
        } else {
            Vec::new()
        };
        let records = std::mem::take(&mut self.records);
        let len = records.len();
        let batch = Value::Array(records);

        let out = train(&batch);

        self.records = match batch {
            Value::Array(mut records) => {
                records.clear();
                records.extend(rest);
                records
            }
            _ => rest,
        };
        (len, out)
    }

    /// Switch to a new batch size, keeping pending records in order.
    pub fn resize(&mut self, batch_size: usize) {
        self.batch_size = batch_size;
        if self.records.capacity() < batch_size {
            self.records.reserve_exact(batch_size - self.records.len());
        }
    }

    /// Release all records and their allocation.
    pub fn discard(&mut self) {
        self.records = Vec::new();
    }
}
