//! Batches handed to publisher sinks

use tally_protocol::{Datum, Event, Sample};

/// An ordered group of samples and events published together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    items: Vec<Datum>,
}

impl Batch {
    pub fn new(items: Vec<Datum>) -> Self {
        Self { items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Datum] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Datum> {
        self.items
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.items.iter().filter_map(Datum::as_sample)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.items.iter().filter_map(Datum::as_event)
    }
}

impl From<Vec<Datum>> for Batch {
    fn from(items: Vec<Datum>) -> Self {
        Self::new(items)
    }
}

impl From<Vec<Sample>> for Batch {
    fn from(samples: Vec<Sample>) -> Self {
        Self::new(samples.into_iter().map(Datum::Sample).collect())
    }
}

impl From<Datum> for Batch {
    fn from(item: Datum) -> Self {
        Self::new(vec![item])
    }
}

impl FromIterator<Datum> for Batch {
    fn from_iter<I: IntoIterator<Item = Datum>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
