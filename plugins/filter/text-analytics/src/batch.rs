use std::num::NonZeroUsize;

use enrich_api::value::Record;

/// Records flushed from the accumulator, before documents are built.
#[derive(Debug)]
pub struct RecordBatch {
    /// Stream position of `records[0]`.
    pub first_row: usize,
    pub records: Vec<Record>,
}

/// Buffers records until capacity is reached.
///
/// `capacity = None` never flushes on `add`; everything comes out of `finish`.
#[derive(Debug)]
pub struct BatchAccumulator {
    capacity: Option<NonZeroUsize>,
    buffer: Vec<Record>,
    next_row: usize,
}

impl BatchAccumulator {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            capacity,
            buffer: Vec::with_capacity(capacity.map_or(0, NonZeroUsize::get)),
            next_row: 0,
        }
    }

    /// Buffer one record; returns a full batch when capacity is reached.
    pub fn add(&mut self, record: Record) -> Option<RecordBatch> {
        self.buffer.push(record);
        match self.capacity {
            Some(cap) if self.buffer.len() >= cap.get() => Some(self.flush()),
            _ => None,
        }
    }

    /// Remaining records as a final batch, if any.
    pub fn finish(&mut self) -> Option<RecordBatch> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.flush())
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn flush(&mut self) -> RecordBatch {
        let records = std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.capacity.map_or(0, NonZeroUsize::get)),
        );
        let first_row = self.next_row;
        self.next_row += records.len();
        RecordBatch { first_row, records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrich_api::value::Value;

    fn drain(capacity: Option<usize>, n: usize) -> Vec<RecordBatch> {
        let mut acc = BatchAccumulator::new(capacity.and_then(NonZeroUsize::new));
        let mut batches = Vec::new();
        for i in 0..n {
            if let Some(batch) = acc.add(Record::new(vec![Value::Long(i as i64)])) {
                batches.push(batch);
            }
        }
        batches.extend(acc.finish());
        batches
    }

    #[test]
    fn emits_ceil_n_over_c_batches() {
        for (cap, n) in [(100, 250), (3, 9), (1, 5), (7, 1), (100, 100)] {
            let batches = drain(Some(cap), n);
            assert_eq!(batches.len(), n.div_ceil(cap), "cap={cap} n={n}");
            let (last, full) = batches.split_last().unwrap();
            assert!(full.iter().all(|b| b.records.len() == cap));
            assert!(last.records.len() <= cap && !last.records.is_empty());
        }
    }

    #[test]
    fn empty_stream_emits_nothing() {
        assert!(drain(Some(10), 0).is_empty());
        assert!(drain(None, 0).is_empty());
    }

    #[test]
    fn unbounded_flushes_once_at_finish() {
        let batches = drain(None, 1234);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records.len(), 1234);
    }

    #[test]
    fn rows_are_numbered_across_batches() {
        let batches = drain(Some(4), 10);
        let firsts: Vec<_> = batches.iter().map(|b| b.first_row).collect();
        assert_eq!(firsts, [0, 4, 8]);
        assert_eq!(batches[2].records[1], Record::new(vec![Value::Long(9)]));
    }

    #[test]
    fn finish_does_not_repeat_a_flushed_batch() {
        let mut acc = BatchAccumulator::new(NonZeroUsize::new(2));
        assert!(acc.add(Record::default()).is_none());
        assert!(acc.add(Record::default()).is_some());
        assert_eq!(acc.buffered(), 0);
        assert!(acc.finish().is_none());
        assert!(acc.finish().is_none());
    }
}
