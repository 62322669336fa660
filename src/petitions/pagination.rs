use crate::error::{AppError, AppResult};

/// A window over a filtered result set plus the size of the whole set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Cut `[start_index, start_index + count)` out of `results`.
///
/// Bounds are validated against the real result size instead of being
/// clamped: a start at or past the end fails, and so does a count that is
/// not strictly smaller than what remains after the start.
pub fn paginate<T>(results: Vec<T>, start_index: Option<usize>, count: Option<usize>) -> AppResult<Page<T>> {
    let total = results.len();

    let start = match start_index {
        Some(s) if s >= total => {
            return Err(AppError::Range(format!(
                "start index {s} beyond result set of {total}"
            )));
        }
        Some(s) => s,
        None => 0,
    };
    let remaining = total - start;

    let take = match count {
        Some(c) if c >= remaining => {
            return Err(AppError::Range(format!(
                "count {c} not below the {remaining} remaining results"
            )));
        }
        Some(c) => c,
        None => remaining,
    };

    let items = results.into_iter().skip(start).take(take).collect();
    Ok(Page { items, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten() -> Vec<u32> {
        (0..10).collect()
    }

    #[test]
    fn no_bounds_returns_everything() {
        let page = paginate(ten(), None, None).unwrap();
        assert_eq!(page.items, ten());
        assert_eq!(page.total, 10);
    }

    #[test]
    fn start_index_skips() {
        let page = paginate(ten(), Some(7), None).unwrap();
        assert_eq!(page.items, vec![7, 8, 9]);
        assert_eq!(page.total, 10);
    }

    #[test]
    fn count_limits() {
        let page = paginate(ten(), Some(2), Some(3)).unwrap();
        assert_eq!(page.items, vec![2, 3, 4]);
        assert_eq!(page.total, 10);
    }

    #[test]
    fn start_at_or_past_end_is_a_range_error() {
        for start in [10, 11, 500] {
            assert!(matches!(paginate(ten(), Some(start), None), Err(AppError::Range(_))));
        }
        assert!(matches!(
            paginate(Vec::<u32>::new(), Some(0), None),
            Err(AppError::Range(_))
        ));
    }

    #[test]
    fn count_must_be_below_remaining() {
        assert!(matches!(paginate(ten(), None, Some(10)), Err(AppError::Range(_))));
        assert!(matches!(paginate(ten(), Some(8), Some(2)), Err(AppError::Range(_))));
        assert_eq!(paginate(ten(), Some(8), Some(1)).unwrap().items, vec![8]);
    }

    #[test]
    fn zero_count_on_non_empty_remainder_is_empty_window() {
        let page = paginate(ten(), Some(3), Some(0)).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 10);
    }
}
