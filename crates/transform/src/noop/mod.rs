//! Noop Transformer - Pass-through transformer for testing
//!
//! The `NoopTransformer` passes samples through unchanged. It's useful for
//! exercising chain plumbing and as a placeholder stage in configs.

use tally_config::TransformerInstanceConfig;
use tally_protocol::Sample;

use crate::registry::TransformerFactory;
use crate::{TransformResult, Transformer};


/// A transformer that passes samples through unchanged
#[derive(Debug, Clone, Copy)]
pub struct NoopTransformer {
    enabled: bool,
}

impl NoopTransformer {
    /// Create a new noop transformer
    #[inline]
    pub const fn new() -> Self {
        Self { enabled: true }
    }

    /// Create a disabled noop transformer
    #[inline]
    pub const fn disabled() -> Self {
        Self { enabled: false }
    }
}

impl Default for NoopTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer for NoopTransformer {
    fn transform(&mut self, sample: Sample) -> TransformResult<Vec<Sample>> {
        Ok(vec![sample])
    }

    fn name(&self) -> &'static str {
        "noop"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Factory for the `noop` type
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFactory;

impl TransformerFactory for NoopFactory {
    fn create(&self, config: &TransformerInstanceConfig) -> TransformResult<Box<dyn Transformer>> {
        if config.enabled {
            Ok(Box::new(NoopTransformer::new()))
        } else {
            Ok(Box::new(NoopTransformer::disabled()))
        }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
