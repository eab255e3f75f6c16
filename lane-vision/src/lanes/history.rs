use std::collections::{vec_deque, VecDeque};

/// Sliding window over the most recent `capacity` values.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn last(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.values.iter()
    }

    /// Mean of `key` over the window, `None` when empty.
    pub fn mean_by(&self, key: impl Fn(&T) -> f64) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().map(key).sum::<f64>() / self.values.len() as f64)
    }
}

impl BoundedHistory<f64> {
    pub fn mean(&self) -> Option<f64> {
        self.mean_by(|v| *v)
    }
}
