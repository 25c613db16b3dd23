//! Transformer Chain - Sequential sample transformation
//!
//! The `Chain` applies a pipeline's transformer stages in order. Each stage
//! may emit zero, one or many samples per input; every output is fed to the
//! next stage.
//!
//! # Design
//!
//! - **Zero-cost when empty**: Empty chain returns the input unchanged
//! - **Fail-fast on process**: The first stage error aborts that sample
//! - **Best-effort on flush**: `flush_all` collects stage errors and keeps going
//! - **Owned state**: A chain belongs to exactly one pipeline and is driven
//!   through `&mut self`, so aggregation state is never shared

use tally_protocol::Sample;

use crate::{StageError, Transformer};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Result of flushing every stage
#[derive(Debug, Default)]
pub struct FlushOutcome {
    /// Samples that made it out of the last stage
    pub samples: Vec<Sample>,
    /// Stage errors encountered along the way
    pub errors: Vec<StageError>,
}

impl FlushOutcome {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Ordered transformer stages bound to one pipeline
pub struct Chain {
    transformers: Vec<Box<dyn Transformer>>,
}

impl Chain {
    /// Create a new transformer chain
    ///
    /// Only enabled transformers are included.
    pub fn new(transformers: Vec<Box<dyn Transformer>>) -> Self {
        Self {
            transformers: transformers.into_iter().filter(|t| t.enabled()).collect(),
        }
    }

    /// Create an empty chain (no-op)
    pub fn empty() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Names of all active transformers, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Run one sample through every stage
    ///
    /// Returns 0..n output samples. The first stage error stops the chain
    /// for this sample; stages before it keep whatever state they built.
    pub fn process(&mut self, sample: Sample) -> Result<Vec<Sample>, StageError> {
        if self.transformers.is_empty() {
            return Ok(vec![sample]);
        }

        let mut current = vec![sample];
        for (position, stage) in self.transformers.iter_mut().enumerate() {
            let mut next = Vec::with_capacity(current.len());
            for sample in current {
                let out = stage.transform(sample).map_err(|error| StageError {
                    stage: stage.name(),
                    position,
                    error,
                })?;
                next.extend(out);
            }
            if next.is_empty() {
                return Ok(next);
            }
            current = next;
        }
        Ok(current)
    }

    /// Flush every stage in order
    ///
    /// Output flushed from stage `i` is run through stages `i+1..` before
    /// they are flushed themselves. Errors are collected and never stop the
    /// remaining stages.
    pub fn flush_all(&mut self) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();
        let mut pending: Vec<Sample> = Vec::new();

        for (position, stage) in self.transformers.iter_mut().enumerate() {
            let mut next = Vec::with_capacity(pending.len());

            for sample in pending.drain(..) {
                match stage.transform(sample) {
                    Ok(out) => next.extend(out),
                    Err(error) => outcome.errors.push(StageError {
                        stage: stage.name(),
                        position,
                        error,
                    }),
                }
            }

            match stage.flush() {
                Ok(out) => next.extend(out),
                Err(error) => outcome.errors.push(StageError {
                    stage: stage.name(),
                    position,
                    error,
                }),
            }

            pending = next;
        }

        outcome.samples = pending;
        outcome
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("stages", &self.names()).finish()
    }
}
