//! Bounded sample history
//!
//! Each worker keeps its most recent samples in insertion order. Once the
//! buffer is full the oldest sample is evicted.

use crate::types::Sample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed-capacity, insertion-ordered sample buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest when full
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Replace the contents, keeping only the newest `capacity` samples
    pub fn replace<I: IntoIterator<Item = Sample>>(&mut self, samples: I) {
        self.samples.clear();
        for sample in samples {
            self.push(sample);
        }
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Copy out the samples, oldest first
    pub fn to_vec(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }
}
