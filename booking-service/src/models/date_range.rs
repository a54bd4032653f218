//! Inclusive whole-day date range.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// `[start, end]`, both days included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, returning `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Inclusive day count: `(end - start).days + 1`.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Inclusive overlap: `s1 <= e2 && s2 <= e1`.
    ///
    /// This is the only conflict predicate in the service.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// A range is a weekend window when any of its days is a Saturday or Sunday.
    pub fn is_weekend_window(&self) -> bool {
        self.days() >= 7
            || self
                .iter_days()
                .any(|d| matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
    }

    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(d(a), d(b)).unwrap()
    }

    #[test]
    fn rejects_reversed_bounds() {
        assert!(DateRange::new(d("2026-05-03"), d("2026-05-02")).is_none());
        assert!(DateRange::new(d("2026-05-03"), d("2026-05-03")).is_some());
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(range("2026-05-01", "2026-05-01").days(), 1);
        assert_eq!(range("2026-05-01", "2026-05-03").days(), 3);
        assert_eq!(range("2026-02-27", "2026-03-02").days(), 4);
    }

    #[test]
    fn touching_ranges_overlap_on_the_shared_day() {
        let a = range("2026-05-01", "2026-05-03");
        assert!(a.overlaps(&range("2026-05-03", "2026-05-05")));
        assert!(range("2026-05-03", "2026-05-05").overlaps(&a));
        assert!(!a.overlaps(&range("2026-05-04", "2026-05-05")));
    }

    #[test]
    fn containment_counts_as_overlap() {
        let outer = range("2026-05-01", "2026-05-31");
        let inner = range("2026-05-10", "2026-05-11");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn weekend_window_detection() {
        // 2026-05-04 is a Monday.
        assert!(!range("2026-05-04", "2026-05-08").is_weekend_window());
        assert!(range("2026-05-08", "2026-05-09").is_weekend_window());
        assert!(range("2026-05-10", "2026-05-10").is_weekend_window());
    }

    #[test]
    fn iter_days_walks_every_day_once() {
        let days: Vec<_> = range("2026-12-30", "2027-01-02").iter_days().collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], d("2026-12-30"));
        assert_eq!(days[3], d("2027-01-02"));
    }
}
