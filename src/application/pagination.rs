//! Numbered pagination over an ordered result set.
//!
//! [`Paginator`] is a pure value type built from the total item count, the
//! configured page size, and the requested page number. It is independent of
//! any storage technology; repositories consume the derived offset/limit and
//! the view layer consumes [`PaginationWindow`], the strip of page links and
//! ellipsis markers shown around the current page.

use std::num::NonZeroU32;

use thiserror::Error;

/// How many page links are shown on each side of the current page.
const WINDOW_SPAN: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page {requested} is out of range 1..={total_pages}")]
    PageOutOfRange { requested: u32, total_pages: u32 },
}

/// Per-request pagination state for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total_items: u64,
    page_size: NonZeroU32,
    current: u32,
}

impl Paginator {
    /// Build a paginator for `requested_page` over `total_items` items.
    ///
    /// A request outside `1..=total_pages` is a contract violation and fails
    /// fast rather than clamping; the HTTP layer surfaces it as a missing
    /// page. An empty result set still has one (empty) page, so `page=1` is
    /// always valid.
    pub fn new(
        total_items: u64,
        page_size: NonZeroU32,
        requested_page: u32,
    ) -> Result<Self, PaginationError> {
        let total_pages = total_pages_for(total_items, page_size);
        if requested_page == 0 || requested_page > total_pages {
            return Err(PaginationError::PageOutOfRange {
                requested: requested_page,
                total_pages,
            });
        }

        Ok(Self {
            total_items,
            page_size,
            current: requested_page,
        })
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn current_page(&self) -> u32 {
        self.current
    }

    pub fn total_pages(&self) -> u32 {
        total_pages_for(self.total_items, self.page_size)
    }

    pub fn is_paginated(&self) -> bool {
        self.total_pages() > 1
    }

    /// Row offset of the current page within the ordered result set.
    pub fn offset(&self) -> u64 {
        u64::from(self.current - 1) * u64::from(self.page_size.get())
    }

    pub fn limit(&self) -> u32 {
        self.page_size.get()
    }

    /// Every page number, `1..=total_pages`.
    pub fn page_range(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.total_pages()
    }

    /// The navigation strip around the current page. Empty (all flags false)
    /// when only one page exists, so callers can skip rendering the strip.
    pub fn window(&self) -> PaginationWindow {
        let total_pages = self.total_pages();
        if total_pages <= 1 {
            return PaginationWindow::default();
        }

        let page_range: Vec<u32> = self.page_range().collect();
        let current = self.current as usize;
        let mut window = PaginationWindow::default();

        // Slice bounds mirror 0-indexed slicing over `page_range` with the
        // upper bound clamped: left covers the two pages before the current
        // one, right the two after.
        if current > 1 {
            let start = current.saturating_sub(1 + WINDOW_SPAN);
            window.left = page_range[start..current - 1].to_vec();

            let leftmost = window.left[0];
            window.left_has_more = leftmost > 2;
            window.first = leftmost > 1;
        }

        if current < total_pages as usize {
            let end = (current + WINDOW_SPAN).min(total_pages as usize);
            window.right = page_range[current..end].to_vec();

            let rightmost = *window.right.last().expect("right side is non-empty");
            window.right_has_more = rightmost < total_pages - 1;
            window.last = rightmost < total_pages;
        }

        window
    }
}

/// Which page links and ellipsis markers the navigation strip shows.
///
/// `left`/`right` are the runs of consecutive page numbers around the current
/// page; `first`/`last` ask for the boundary pages to be shown explicitly and
/// `left_has_more`/`right_has_more` for an ellipsis between the boundary page
/// and the adjacent run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationWindow {
    pub left: Vec<u32>,
    pub right: Vec<u32>,
    pub left_has_more: bool,
    pub right_has_more: bool,
    pub first: bool,
    pub last: bool,
}

impl PaginationWindow {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
            && self.right.is_empty()
            && !self.first
            && !self.last
            && !self.left_has_more
            && !self.right_has_more
    }
}

fn total_pages_for(total_items: u64, page_size: NonZeroU32) -> u32 {
    let size = u64::from(page_size.get());
    let pages = total_items.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paginator(total_pages: u32, current: u32) -> Paginator {
        // One item per page keeps total_pages == total_items in tests.
        Paginator::new(u64::from(total_pages), NonZeroU32::new(1).unwrap(), current)
            .expect("page within range")
    }

    #[test]
    fn first_page_of_ten_shows_right_run_and_trailing_ellipsis() {
        let window = paginator(10, 1).window();

        assert_eq!(window.left, Vec::<u32>::new());
        assert_eq!(window.right, vec![2, 3]);
        assert!(!window.first);
        assert!(!window.left_has_more);
        assert!(window.right_has_more);
        assert!(window.last);
    }

    #[test]
    fn last_page_of_ten_shows_left_run_and_leading_ellipsis() {
        let window = paginator(10, 10).window();

        assert_eq!(window.left, vec![8, 9]);
        assert_eq!(window.right, Vec::<u32>::new());
        assert!(window.first);
        assert!(window.left_has_more);
        assert!(!window.right_has_more);
        assert!(!window.last);
    }

    #[test]
    fn middle_page_of_five_reaches_both_boundaries() {
        // Both runs touch the ends, so no ellipses and no explicit
        // first/last links.
        let window = paginator(5, 3).window();

        assert_eq!(window.left, vec![1, 2]);
        assert_eq!(window.right, vec![4, 5]);
        assert!(!window.first);
        assert!(!window.left_has_more);
        assert!(!window.right_has_more);
        assert!(!window.last);
    }

    #[test]
    fn middle_page_far_from_both_ends_shows_both_ellipses() {
        let window = paginator(12, 6).window();

        assert_eq!(window.left, vec![4, 5]);
        assert_eq!(window.right, vec![7, 8]);
        assert!(window.first);
        assert!(window.left_has_more);
        assert!(window.right_has_more);
        assert!(window.last);
    }

    #[test]
    fn second_page_keeps_page_one_inside_left_run() {
        let window = paginator(10, 2).window();

        assert_eq!(window.left, vec![1]);
        assert!(!window.first);
        assert!(!window.left_has_more);
        assert_eq!(window.right, vec![3, 4]);
        assert!(window.right_has_more);
        assert!(window.last);
    }

    #[test]
    fn single_page_yields_empty_window() {
        let paginator = Paginator::new(1, NonZeroU32::new(10).unwrap(), 1).expect("page 1");
        assert!(!paginator.is_paginated());
        assert!(paginator.window().is_empty());
    }

    #[test]
    fn two_pages_have_no_ellipses() {
        let window = paginator(2, 1).window();
        assert_eq!(window.right, vec![2]);
        assert!(!window.right_has_more);
        assert!(!window.last);

        let window = paginator(2, 2).window();
        assert_eq!(window.left, vec![1]);
        assert!(!window.left_has_more);
        assert!(!window.first);
    }

    #[test]
    fn out_of_range_page_fails_fast() {
        let err = Paginator::new(10, NonZeroU32::new(3).unwrap(), 5).expect_err("page 5 of 4");
        assert_eq!(
            err,
            PaginationError::PageOutOfRange {
                requested: 5,
                total_pages: 4,
            }
        );

        let err = Paginator::new(10, NonZeroU32::new(3).unwrap(), 0).expect_err("page 0");
        assert!(matches!(err, PaginationError::PageOutOfRange { .. }));
    }

    #[test]
    fn empty_result_set_still_has_one_page() {
        let paginator = Paginator::new(0, NonZeroU32::new(10).unwrap(), 1).expect("page 1");
        assert_eq!(paginator.total_pages(), 1);
        assert_eq!(paginator.offset(), 0);
        assert!(paginator.window().is_empty());
    }

    #[test]
    fn offset_and_limit_follow_the_requested_page() {
        let paginator = Paginator::new(47, NonZeroU32::new(10).unwrap(), 4).expect("page 4");
        assert_eq!(paginator.total_pages(), 5);
        assert_eq!(paginator.offset(), 30);
        assert_eq!(paginator.limit(), 10);
    }

    /// Every shown page number must be strictly increasing with no duplicates,
    /// and the ellipsis flags must only be set when a real gap exists.
    #[test]
    fn window_invariants_hold_for_all_small_shapes() {
        for total_pages in 2..=40u32 {
            for current in 1..=total_pages {
                let window = paginator(total_pages, current).window();

                let mut shown: Vec<u32> = Vec::new();
                if window.first {
                    shown.push(1);
                }
                shown.extend(&window.left);
                shown.push(current);
                shown.extend(&window.right);
                if window.last {
                    shown.push(total_pages);
                }

                assert!(
                    shown.windows(2).all(|pair| pair[0] < pair[1]),
                    "not strictly increasing: {shown:?} (pages={total_pages}, current={current})"
                );

                if window.left_has_more {
                    assert!(!window.left.is_empty());
                    assert!(window.left[0] > 2);
                }
                if window.right_has_more {
                    assert!(!window.right.is_empty());
                    assert!(window.right[window.right.len() - 1] < total_pages - 1);
                }
                if current == 1 {
                    assert!(window.left.is_empty());
                    assert!(!window.first);
                }
                if current == total_pages {
                    assert!(window.right.is_empty());
                    assert!(!window.last);
                }
            }
        }
    }
}
