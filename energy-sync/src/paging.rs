//! Last-page arithmetic for the monitoring API's fixed-size pages.

/// Items per page on the monitoring API. Must match the server side.
pub const PAGE_SIZE: i64 = 10;

/// Page number of the first page; the monitoring API numbers pages from 1.
pub const FIRST_PAGE: u64 = 1;

/// Index of the page holding the newest items, given the total `count`.
///
/// An unknown (`None`) or negative count yields `None` and callers skip the
/// follow-up request. A count of zero yields page `0`, meaning "no page".
pub fn last_page(count: Option<i64>) -> Option<u64> {
    let count = count.filter(|c| *c >= 0)?;
    let full = count / PAGE_SIZE;
    let page = if count % PAGE_SIZE == 0 { full } else { full + 1 };
    u64::try_from(page).ok()
}
