//! Variant resolution.

use rand::Rng;

/// Where a selected index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// A valid selection cookie on the request.
    Cookie,
    /// A fresh uniform draw.
    Random,
}

impl SelectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionSource::Cookie => "cookie",
            SelectionSource::Random => "random",
        }
    }
}

/// A resolved variant index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub source: SelectionSource,
}

impl Selection {
    /// True when the client must be sent a selection cookie.
    pub fn is_new(&self) -> bool {
        self.source == SelectionSource::Random
    }
}

/// Resolve the variant index for a request.
///
/// A previous index inside `[0, variant_count)` is reused as-is. Anything else
/// (no cookie, or a stale index after the list shrank) draws uniformly from
/// `[0, variant_count)`. Returns `None` only when there are no variants.
pub fn resolve_variant<R>(variant_count: usize, previous: Option<usize>, rng: &mut R) -> Option<Selection>
where
    R: Rng + ?Sized,
{
    if variant_count == 0 {
        return None;
    }

    match previous {
        Some(index) if index < variant_count => Some(Selection {
            index,
            source: SelectionSource::Cookie,
        }),
        stale => {
            if let Some(index) = stale {
                tracing::debug!(index, variant_count, "Ignoring out-of-range selection cookie");
            }
            Some(Selection {
                index: rng.gen_range(0..variant_count),
                source: SelectionSource::Random,
            })
        }
    }
}
