#![forbid(unsafe_code)]

//! Bounded history of past states for fading trails.

use std::collections::VecDeque;

/// Effective trail capacity for a configured length and quality.
///
/// `max(max(5, length / 4), floor(length * quality))`. The floor keeps a
/// visible trail even under the heaviest throttling.
#[inline]
pub fn effective_cap(length: usize, quality: f32) -> usize {
    let floor = (length / 4).max(5);
    let scaled = (length as f64 * f64::from(quality.clamp(0.0, 1.0))).floor() as usize;
    floor.max(scaled)
}

/// Number of trail entries drawn per frame.
///
/// `max(max(3, len / 4), floor(len * quality))`, never more than `len`.
#[inline]
pub fn drawn_entries(len: usize, quality: f32) -> usize {
    let floor = (len / 4).max(3);
    let scaled = (len as f64 * f64::from(quality.clamp(0.0, 1.0))).floor() as usize;
    floor.max(scaled).min(len)
}

/// Ring buffer of entries, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Trail<T> {
    entries: VecDeque<T>,
}

impl<T> Trail<T> {
    /// Empty trail.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append `entry`, then drop the oldest entries beyond `cap`.
    pub fn push(&mut self, entry: T, cap: usize) {
        self.entries.push_back(entry);
        self.truncate(cap);
    }

    /// Drop the oldest entries beyond `cap`.
    pub fn truncate(&mut self, cap: usize) {
        while self.entries.len() > cap {
            self.entries.pop_front();
        }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the trail is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Most recent entry.
    pub fn newest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// The newest `n` entries, oldest of them first.
    pub fn newest_n(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip)
    }

    /// All entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_examples() {
        assert_eq!(effective_cap(50, 1.0), 50);
        assert_eq!(effective_cap(50, 0.5), 25);
        assert_eq!(effective_cap(50, 0.1), 12);
        assert_eq!(effective_cap(10, 0.0), 5);
        assert_eq!(effective_cap(200, 0.3), 60);
    }

    #[test]
    fn push_truncates_oldest() {
        let mut t = Trail::new();
        for i in 0..8 {
            t.push(i, 5);
        }
        assert_eq!(t.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7]);
        assert_eq!(t.newest(), Some(&7));
    }

    #[test]
    fn newest_n_keeps_order() {
        let mut t = Trail::new();
        for i in 0..6 {
            t.push(i, 10);
        }
        assert_eq!(t.newest_n(3).copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(t.newest_n(99).count(), 6);
    }

    #[test]
    fn drawn_entries_bounds() {
        assert_eq!(drawn_entries(0, 1.0), 0);
        assert_eq!(drawn_entries(2, 0.0), 2);
        assert_eq!(drawn_entries(40, 0.3), 12);
        assert_eq!(drawn_entries(40, 0.1), 10);
    }
}
