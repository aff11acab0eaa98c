//! Page arithmetic for list endpoints.
//!
//! Callers speak one-based pages; the math below is zero-based. Convert with
//! [`adjust_page`] first.

/// Converts a one-based page number to zero-based, never below zero.
pub fn adjust_page(page: i64) -> i64 {
    page.saturating_sub(1).max(0)
}

/// True when records remain after zero-based `page`.
///
/// A page whose end lies beyond `u64::MAX` has nothing after it.
pub fn has_next_page(page: u64, page_size: u64, record_count: u64) -> bool {
    page.checked_mul(page_size)
        .and_then(|start| start.checked_add(page_size))
        .is_some_and(|end| end < record_count)
}

/// Number of pages needed for `record_count` records. Zero when `page_size`
/// is zero.
pub fn total_pages(page_size: u64, record_count: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    record_count.div_ceil(page_size)
}
