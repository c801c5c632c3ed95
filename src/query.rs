//! Range Query Module
//!
//! Windowed ascending/descending iteration over the sorted key list.
//!
//! A query names a starting point ([`Seek`]), then skips `offset` keys and
//! takes up to `limit` keys (0 = no limit) in the traversal direction.
//!
//! ```text
//! keys:      01 02 03 ... 10 11 12 13 14 15 ...
//! seek "10", offset 2, limit 2, ascending
//!                      ^seek (excluded)
//!                         11 12 (skipped)
//!                               13 14 (returned)
//! ```

use crate::encoding::Key;
use crate::error::{Result, TwinlogError};
use crate::keydir::KeyDir;

/// Trailing byte that turns a seek key into a prefix query
pub const PREFIX_MARKER: u8 = b'*';

/// Where a range query starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seek {
    /// First key (ascending) or last key (descending), included
    Start,

    /// An existing key; the window begins just after it
    Exact(Vec<u8>),

    /// First key carrying the prefix in the traversal direction, included
    Prefix(Vec<u8>),
}

impl Seek {
    /// Interpret a seek key. Only byte and string keys can be prefix
    /// queries: a trailing `*` after at least one byte marks one. Scalar and
    /// structured keys always seek exactly, whatever their encoded bytes end in.
    pub fn parse(key: Option<Key>) -> Self {
        let key = match key {
            None => return Seek::Start,
            Some(key) => key,
        };
        let textual = matches!(key, Key::Bytes(_) | Key::Str(_));
        let mut bytes = key.into_bytes();
        if textual && bytes.len() > 1 && bytes.last() == Some(&PREFIX_MARKER) {
            bytes.pop();
            return Seek::Prefix(bytes);
        }
        Seek::Exact(bytes)
    }
}

/// Inclusive index range into the sorted key list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub ascending: bool,
}

impl Window {
    /// Indices from `start` to `end` in traversal order
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let (lo, hi) = if self.ascending {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        let ascending = self.ascending;
        (0..=hi - lo).map(move |i| if ascending { lo + i } else { hi - i })
    }
}

/// Compute the window for a query anchored at index `found`.
///
/// `exclude_from` is 1 when the anchor itself must be skipped. Returns `None`
/// when the window is empty or inverted.
pub fn window(
    found: usize,
    limit: usize,
    offset: usize,
    exclude_from: usize,
    total: usize,
    ascending: bool,
) -> Option<Window> {
    if total == 0 {
        return None;
    }

    let total = to_i64(total);
    let found = to_i64(found);
    let skip = to_i64(offset).saturating_add(to_i64(exclude_from));
    let limit = to_i64(limit);

    let (start, end) = if ascending {
        let start = found.saturating_add(skip);
        let end = if limit == 0 {
            total - 1
        } else {
            start.saturating_add(limit - 1)
        };
        (start, end)
    } else {
        let start = found.saturating_sub(skip);
        let end = if limit == 0 {
            0
        } else {
            start.saturating_sub(limit - 1)
        };
        (start, end)
    };
    let end = end.clamp(0, total - 1);

    if start < 0 || start >= total {
        return None;
    }
    if (ascending && start > end) || (!ascending && start < end) {
        return None;
    }

    Some(Window {
        start: start as usize,
        end: end as usize,
        ascending,
    })
}

/// Run a range query against the directory.
///
/// An exact seek key that is not live, or a prefix no key carries, is
/// [`TwinlogError::KeyNotFound`]. An empty window is an empty result.
pub fn select(
    keydir: &mut KeyDir,
    seek: &Seek,
    limit: usize,
    offset: usize,
    ascending: bool,
) -> Result<Vec<Vec<u8>>> {
    match seek {
        Seek::Prefix(prefix) => return select_prefix(keydir, prefix, limit, offset, ascending),
        Seek::Start | Seek::Exact(_) => {}
    }

    let (found, exclude_from) = match seek {
        Seek::Exact(key) => (keydir.find_exact(key).ok_or(TwinlogError::KeyNotFound)?, 1),
        _ if ascending => (0, 0),
        _ => (keydir.len().saturating_sub(1), 0),
    };

    let keys = keydir.sorted_keys();
    let Some(window) = window(found, limit, offset, exclude_from, keys.len(), ascending) else {
        return Ok(Vec::new());
    };

    Ok(window.indices().map(|i| keys[i].clone()).collect())
}

/// Run a prefix query; the walk stops at the first key without the prefix.
pub fn select_prefix(
    keydir: &mut KeyDir,
    prefix: &[u8],
    limit: usize,
    offset: usize,
    ascending: bool,
) -> Result<Vec<Vec<u8>>> {
    let found = keydir
        .find_prefix(prefix, ascending)
        .ok_or(TwinlogError::KeyNotFound)?;

    let keys = keydir.sorted_keys();
    let Some(window) = window(found, limit, offset, 0, keys.len(), ascending) else {
        return Ok(Vec::new());
    };

    Ok(window
        .indices()
        .map(|i| &keys[i])
        .take_while(|k| k.starts_with(prefix))
        .cloned()
        .collect())
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
