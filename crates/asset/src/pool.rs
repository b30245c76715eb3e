//! Attribute pools addressed directly by raw OBJ indices.
//!
//! Slot 0 of every pool is an all-zero sentinel, so a positive 1-based index
//! already names its pool slot. Resolution never yields slot 0: valid output
//! only ever reads elements that were appended.

use corelib::ErrorKind;

/// Resolve a raw, possibly negative (relative-from-end) index against a pool
/// of `len` slots, sentinel included. Returns `None` outside `[1, len - 1]`.
pub fn resolve_index(raw: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if raw >= 0 { raw } else { len + raw };
    if idx < 1 || idx >= len {
        return None;
    }
    usize::try_from(idx).ok()
}

/// Append-only pool of fixed-arity tuples.
#[derive(Clone, Debug)]
pub struct AttributePool<const N: usize> {
    channel: &'static str,
    items: Vec<[f32; N]>,
}

impl<const N: usize> AttributePool<N> {
    pub fn new(channel: &'static str) -> Self {
        Self {
            channel,
            items: vec![[0.0; N]],
        }
    }

    pub fn push(&mut self, item: [f32; N]) {
        self.items.push(item);
    }

    /// Number of slots including the sentinel.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` while only the sentinel is present.
    pub fn is_empty(&self) -> bool {
        self.items.len() <= 1
    }

    pub fn resolve(&self, raw: i64) -> Result<usize, ErrorKind> {
        resolve_index(raw, self.items.len()).ok_or(ErrorKind::IndexOutOfRange {
            channel: self.channel,
            raw,
            len: self.items.len(),
        })
    }

    /// Resolve `raw` and copy out the tuple it names.
    pub fn fetch(&self, raw: i64) -> Result<[f32; N], ErrorKind> {
        let idx = self.resolve(raw)?;
        self.items
            .get(idx)
            .copied()
            .ok_or(ErrorKind::IndexOutOfRange {
                channel: self.channel,
                raw,
                len: self.items.len(),
            })
    }
}
