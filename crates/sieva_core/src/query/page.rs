//! Pagination normalization.

/// A caller-supplied page request, before normalization.
///
/// `None` or non-positive values fall back to defaults; callers cannot
/// produce an invalid page, only a corrected one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSpec {
    /// Requested 1-indexed page number.
    pub number: Option<i64>,
    /// Requested page size.
    pub size: Option<i64>,
}

impl PageSpec {
    /// Creates a page spec from explicit values.
    #[must_use]
    pub fn new(number: i64, size: i64) -> Self {
        Self {
            number: Some(number),
            size: Some(size),
        }
    }
}

/// A normalized page: 1-indexed number, positive size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-indexed page number.
    pub number: u64,
    /// Page size, always at least 1.
    pub size: u64,
}

impl Page {
    /// The 0-indexed row offset. Computed only here, at the storage
    /// boundary; the external contract stays 1-indexed.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

/// Normalizes a page spec: number below 1 becomes 1, size at or below
/// zero becomes `default_size`.
#[must_use]
pub fn normalize(spec: PageSpec, default_size: u64) -> Page {
    let number = match spec.number {
        Some(n) if n >= 1 => n as u64,
        _ => 1,
    };
    let size = match spec.size {
        Some(s) if s > 0 => s as u64,
        _ => default_size.max(1),
    };
    Page { number, size }
}
