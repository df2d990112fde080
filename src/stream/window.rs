//! Windowing operators over a stream's published history: pure functions
//! over timestamped/positional slices, no actor or task machinery.

use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Time,
    Count,
    Sliding,
    Session,
}

#[derive(Debug, Clone)]
pub struct Window<T> {
    pub kind: WindowKind,
    pub messages: Vec<T>,
}

/// Fixed, non-overlapping time buckets of `duration`, anchored at the
/// first item's timestamp.
pub fn time_windows<T: Clone>(items: &[(DateTime<Utc>, T)], duration: Duration) -> Vec<Window<T>> {
    let mut windows = Vec::new();
    let Some((first_ts, _)) = items.first() else {
        return windows;
    };
    let mut bucket_start = *first_ts;
    let mut current = Vec::new();
    for (ts, value) in items {
        while *ts >= bucket_start + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero()) {
            windows.push(Window { kind: WindowKind::Time, messages: std::mem::take(&mut current) });
            bucket_start += chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
        }
        current.push(value.clone());
    }
    if !current.is_empty() {
        windows.push(Window { kind: WindowKind::Time, messages: current });
    }
    windows
}

/// Fixed, non-overlapping windows of exactly `count` messages; a final
/// partial window is emitted if the total isn't an exact multiple.
pub fn count_windows<T: Clone>(items: &[T], count: usize) -> Vec<Window<T>> {
    if count == 0 {
        return Vec::new();
    }
    items
        .chunks(count)
        .map(|chunk| Window { kind: WindowKind::Count, messages: chunk.to_vec() })
        .collect()
}

/// Overlapping windows of `size` messages, advancing by `slide` each step.
pub fn sliding_windows<T: Clone>(items: &[T], size: usize, slide: usize) -> Vec<Window<T>> {
    if size == 0 || slide == 0 || items.len() < size {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut start = 0;
    while start + size <= items.len() {
        windows.push(Window {
            kind: WindowKind::Sliding,
            messages: items[start..start + size].to_vec(),
        });
        start += slide;
    }
    windows
}

/// Groups consecutive items into a session whenever the gap between two
/// timestamps exceeds `gap`.
pub fn session_windows<T: Clone>(items: &[(DateTime<Utc>, T)], gap: Duration) -> Vec<Window<T>> {
    let mut windows = Vec::new();
    let mut current = Vec::new();
    let mut last_ts: Option<DateTime<Utc>> = None;
    let gap = chrono::Duration::from_std(gap).unwrap_or_else(|_| chrono::Duration::zero());
    for (ts, value) in items {
        if let Some(last) = last_ts {
            if *ts - last > gap {
                windows.push(Window { kind: WindowKind::Session, messages: std::mem::take(&mut current) });
            }
        }
        current.push(value.clone());
        last_ts = Some(*ts);
    }
    if !current.is_empty() {
        windows.push(Window { kind: WindowKind::Session, messages: current });
    }
    windows
}
