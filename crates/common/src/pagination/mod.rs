//! Page slicing and listing summaries

use serde::{Deserialize, Serialize};

/// Pagination block returned alongside every listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationInfo {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        }
    }
}

/// `ceil(total / page_size)`, zero when either is zero
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// Slice out one 1-based page. Out-of-range pages (including 0) give an
/// empty slice rather than an error.
pub fn paginate<T>(items: &[T], page: u64, page_size: u64) -> (&[T], u64) {
    let pages = total_pages(items.len() as u64, page_size);
    if page == 0 || page > pages {
        return (&[], pages);
    }
    let start = ((page - 1) * page_size) as usize;
    let end = (start + page_size as usize).min(items.len());
    (&items[start..end], pages)
}

/// One numbered page button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageButton {
    pub page: u64,
    pub current: bool,
}

/// Buttons for `1..=total_pages`, with the current page marked
pub fn page_buttons(current: u64, total_pages: u64) -> Vec<PageButton> {
    (1..=total_pages)
        .map(|page| PageButton {
            page,
            current: page == current,
        })
        .collect()
}

/// "Showing X-Y of N"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowingRange {
    pub from: u64,
    pub to: u64,
    pub total: u64,
}

impl ShowingRange {
    pub fn new(page: u64, page_size: u64, total: u64) -> Self {
        let start = page.saturating_sub(1).saturating_mul(page_size);
        let end = start.saturating_add(page_size);
        Self {
            from: start.saturating_add(1).min(total),
            to: end.min(total),
            total,
        }
    }
}

impl std::fmt::Display for ShowingRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Showing {}-{} of {}", self.from, self.to, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_last_page_is_partial() {
        let items: Vec<u32> = (1..=23).collect();
        let (slice, pages) = paginate(&items, 3, 10);
        assert_eq!(pages, 3);
        assert_eq!(slice, &[21, 22, 23]);
    }

    #[test]
    fn test_out_of_range_pages_are_empty() {
        let items: Vec<u32> = (1..=5).collect();
        assert!(paginate(&items, 0, 10).0.is_empty());
        assert!(paginate(&items, 2, 10).0.is_empty());
        assert!(paginate::<u32>(&[], 1, 10).0.is_empty());
    }

    #[test]
    fn test_pages_reconstruct_items_once() {
        for len in [0usize, 1, 9, 10, 11, 57] {
            let items: Vec<usize> = (0..len).collect();
            for size in [1u64, 3, 10] {
                let (_, pages) = paginate(&items, 1, size);
                let joined: Vec<usize> = (1..=pages)
                    .flat_map(|p| paginate(&items, p, size).0.to_vec())
                    .collect();
                assert_eq!(joined, items);
            }
        }
    }

    #[test]
    fn test_page_buttons_mark_current() {
        let buttons = page_buttons(2, 3);
        assert_eq!(buttons.len(), 3);
        assert!(buttons[1].current);
        assert!(!buttons[0].current);
        assert!(page_buttons(1, 0).is_empty());
    }

    #[test]
    fn test_showing_range() {
        assert_eq!(ShowingRange::new(1, 10, 23).to_string(), "Showing 1-10 of 23");
        assert_eq!(ShowingRange::new(3, 10, 23).to_string(), "Showing 21-23 of 23");
        assert_eq!(ShowingRange::new(1, 10, 0).to_string(), "Showing 0-0 of 0");
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let showing = ShowingRange::new(u64::MAX, 10, 23);
        assert_eq!((showing.from, showing.to), (23, 23));

        let items: Vec<u32> = (1..=23).collect();
        assert!(paginate(&items, u64::MAX, 10).0.is_empty());
    }

    #[test]
    fn test_pagination_info_wire_names() {
        let info = PaginationInfo::new(1, 10, 11);
        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["totalPages"], 2);
    }
}
