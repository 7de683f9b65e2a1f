//! Bounded batch ingestion.
//!
//! Records are validated and encoded up front, then staged into batches of at
//! most `max_batch_size` writes. Each full batch is committed before the next
//! one is started; the consistency unit is one batch.

use std::{mem, sync::Arc};

use brolly_core::{
  batch::{MAX_BATCH_WRITES, WriteBatch},
  document::{Fields, to_fields},
  schema::validate_for_collection,
  store::DocumentStore,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{Error, Result, error::annotate};

/// Progress of a bulk write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteReport {
  /// Documents in successfully committed batches.
  pub documents: usize,
  pub batches:   usize,
}

pub struct BatchedWriter<S> {
  store: Arc<S>,
}

impl<S: DocumentStore> BatchedWriter<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Write `records` into `collection`, keyed by `key_fn`.
  ///
  /// A schema failure in any record aborts before the first commit. A commit
  /// failure aborts with [`Error::BatchCommitFailed`], reporting how many
  /// documents are already persisted so the caller can resume from that
  /// offset.
  pub async fn bulk_write<T, K>(
    &self,
    collection: &str,
    records: impl IntoIterator<Item = T>,
    key_fn: K,
    max_batch_size: usize,
  ) -> Result<BulkWriteReport>
  where
    T: Serialize,
    K: Fn(&T) -> String,
  {
    if max_batch_size == 0 || max_batch_size > MAX_BATCH_WRITES {
      return Err(Error::InvalidBatchSize { size: max_batch_size, max: MAX_BATCH_WRITES });
    }

    let staged = records
      .into_iter()
      .map(|record| {
        let fields = to_fields(&record)?;
        validate_for_collection(collection, &fields)?;
        Ok((key_fn(&record), fields))
      })
      .collect::<brolly_core::Result<Vec<(String, Fields)>>>()
      .map_err(annotate("bulk_write"))?;

    let mut report = BulkWriteReport::default();
    let mut batch = self.store.open_batch();
    for (key, fields) in staged {
      batch.set(collection, key, fields);
      if batch.len() == max_batch_size {
        let full = mem::replace(&mut batch, self.store.open_batch());
        self.flush(full, &mut report).await?;
      }
    }
    if !batch.is_empty() {
      self.flush(batch, &mut report).await?;
    }

    info!(
      collection,
      documents = report.documents,
      batches = report.batches,
      "bulk write complete"
    );
    Ok(report)
  }

  async fn flush(&self, batch: WriteBatch, report: &mut BulkWriteReport) -> Result<()> {
    let size = batch.len();
    match self.store.commit(batch).await {
      Ok(_) => {
        report.documents += size;
        report.batches += 1;
        debug!(size, committed = report.documents, "batch committed");
        Ok(())
      }
      Err(source) => Err(Error::BatchCommitFailed {
        committed: report.documents,
        batches: report.batches,
        source,
      }),
    }
  }
}
