//! Per-feature input vectors for the tests.
//!
//! A feeder resolves sample columns once and then hands out one feature's
//! vectors at a time, either by index (for fan-out over a thread pool) or
//! as a lazy iterator that can be restarted by calling [`RowFeeder::rows`]
//! again.

pub mod correlation;
pub mod longitudinal;
pub mod paired;

pub use correlation::{CorrelationFeeder, CorrelationInput};
pub use longitudinal::{LongitudinalFeeder, LongitudinalInput};
pub use paired::{PairedFeeder, PairedInput};

use crate::data::Metadata;
use crate::error::Result;
use std::collections::HashMap;

/// Source of per-feature test inputs.
pub trait RowFeeder: Sync {
    type Row: Send;

    fn n_features(&self) -> usize;

    /// Inputs for the feature at `index`.
    fn row(&self, index: usize) -> Self::Row;

    /// Lazy iterator over every feature, in matrix order.
    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows {
            feeder: self,
            next: 0,
        }
    }
}

/// Iterator returned by [`RowFeeder::rows`].
pub struct Rows<'a, F> {
    feeder: &'a F,
    next: usize,
}

impl<F: RowFeeder> Iterator for Rows<'_, F> {
    type Item = F::Row;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.feeder.n_features() {
            return None;
        }
        let row = self.feeder.row(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.feeder.n_features().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<F: RowFeeder> ExactSizeIterator for Rows<'_, F> {}

/// Gradient value of each metadata sample, keyed by sample ID.
pub(crate) fn gradient_by_sample(
    metadata: &Metadata,
    category: &str,
) -> Result<HashMap<String, Option<f64>>> {
    let values = metadata.gradient(category)?;
    Ok(metadata.sample_ids().iter().cloned().zip(values).collect())
}
