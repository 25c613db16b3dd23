//! Sink table: name to `SinkId` resolution

use std::collections::HashMap;

use crate::{Result, RoutingError, SinkId};

/// Registry of configured sinks for one pipeline generation
///
/// Sinks are registered once at build time. Pipelines then resolve their
/// sink names into ids; unknown names fail here, before anything runs.
#[derive(Debug, Clone, Default)]
pub struct SinkTable {
    ids: HashMap<String, SinkId>,
    names: Vec<String>,
}

impl SinkTable {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink and get its id
    pub fn register(&mut self, name: impl Into<String>) -> Result<SinkId> {
        let name = name.into();
        if self.ids.contains_key(&name) {
            return Err(RoutingError::DuplicateSink { name });
        }
        let index = u16::try_from(self.names.len()).map_err(|_| RoutingError::TooManySinks {
            max: SinkId::MAX as usize,
        })?;

        let id = SinkId::new(index);
        self.ids.insert(name.clone(), id);
        self.names.push(name);
        Ok(id)
    }

    /// Look up a sink id by name
    #[inline]
    pub fn get(&self, name: &str) -> Option<SinkId> {
        self.ids.get(name).copied()
    }

    /// Resolve a pipeline's ordered sink list
    ///
    /// Repeated names collapse to their first occurrence.
    pub fn resolve<S: AsRef<str>>(&self, pipeline: &str, names: &[S]) -> Result<Vec<SinkId>> {
        if names.is_empty() {
            return Err(RoutingError::empty_sinks(pipeline));
        }

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let id = self
                .get(name)
                .ok_or_else(|| RoutingError::unknown_sink(pipeline, name))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Name of a sink by id
    #[inline]
    pub fn name(&self, id: SinkId) -> Option<&str> {
        self.names.get(id.as_usize()).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All registered names in id order
    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
