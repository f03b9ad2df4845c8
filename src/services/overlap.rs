// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Detection of time-conflicting activities on the same day.
//!
//! Two paths flag conflicts:
//! - a pairwise half-open interval test over every scheduled activity, and
//! - clustering of zero-duration activities sharing an exact start minute.
//!
//! Zero-width intervals never satisfy the interval test, so identical point
//! events are only caught by the second path. Both are kept as they are.

use crate::models::Activity;
use crate::services::time_model::to_minutes;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A scheduled activity's span in minutes since midnight, `[start, end)`.
#[derive(Debug, Clone, Copy)]
struct Interval<'a> {
    id: &'a str,
    start: u64,
    end: u64,
    zero_width: bool,
}

impl Interval<'_> {
    fn effective_end(&self) -> u64 {
        self.end.max(self.start)
    }
}

/// Return the ids of all activities that conflict with another one.
///
/// Activities without a parseable time are never flagged. The result does
/// not depend on input order.
pub fn find_overlaps(activities: &[Activity]) -> HashSet<String> {
    let mut by_date: HashMap<&str, Vec<Interval<'_>>> = HashMap::new();

    for activity in activities {
        let Some(start) = activity.time().and_then(to_minutes) else {
            continue;
        };
        let duration = activity.positive_duration();
        by_date
            .entry(activity.date.as_str())
            .or_default()
            .push(Interval {
                id: activity.id.as_str(),
                start: u64::from(start),
                // Durations are unbounded; widen so the end cannot wrap.
                end: u64::from(start) + u64::from(duration.unwrap_or(0)),
                zero_width: duration.is_none(),
            });
    }

    let mut flagged = HashSet::new();
    for intervals in by_date.values_mut() {
        intervals.sort_by_key(|iv| iv.start);
        flag_intersections(intervals, &mut flagged);
        flag_point_clusters(intervals, &mut flagged);
    }

    flagged
}

/// Pairwise interval intersection. O(n²) per day; daily counts are small.
fn flag_intersections(intervals: &[Interval<'_>], flagged: &mut HashSet<String>) {
    for (i, a) in intervals.iter().enumerate() {
        for b in &intervals[i + 1..] {
            let disjoint = a.effective_end() <= b.start || b.effective_end() <= a.start;
            if !disjoint {
                flagged.insert(a.id.to_string());
                flagged.insert(b.id.to_string());
            }
        }
    }
}

/// Zero-duration activities at the same minute conflict with each other.
fn flag_point_clusters(intervals: &[Interval<'_>], flagged: &mut HashSet<String>) {
    let mut clusters: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for iv in intervals.iter().filter(|iv| iv.zero_width) {
        clusters.entry(iv.start).or_default().push(iv.id);
    }

    for ids in clusters.values().filter(|ids| ids.len() >= 2) {
        flagged.extend(ids.iter().map(|id| id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;

    fn activity(id: &str, date: &str, time: Option<&str>, duration: Option<u32>) -> Activity {
        Activity {
            id: id.to_string(),
            date: date.to_string(),
            time: time.map(String::from),
            duration_minutes: duration,
            title: id.to_string(),
            city: None,
            location: None,
            comments: None,
            link: None,
            kind: ActivityType::Activity,
        }
    }

    fn ids(set: &HashSet<String>) -> Vec<&str> {
        let mut v: Vec<&str> = set.iter().map(String::as_str).collect();
        v.sort();
        v
    }

    #[test]
    fn test_overlapping_durations_flag_both() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), Some(90)),
            activity("b", "2024-05-01", Some("11:00"), Some(30)),
        ];
        assert_eq!(ids(&find_overlaps(&list)), vec!["a", "b"]);
    }

    #[test]
    fn test_touching_intervals_do_not_overlap() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), Some(60)),
            activity("b", "2024-05-01", Some("11:00"), Some(60)),
        ];
        assert!(find_overlaps(&list).is_empty());
    }

    #[test]
    fn test_different_days_never_conflict() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), Some(120)),
            activity("b", "2024-05-02", Some("10:30"), Some(30)),
        ];
        assert!(find_overlaps(&list).is_empty());
    }

    #[test]
    fn test_identical_zero_duration_points_are_flagged() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), None),
            activity("b", "2024-05-01", Some("10:00"), None),
            activity("c", "2024-05-01", Some("10:00"), Some(0)),
            activity("d", "2024-05-01", Some("10:01"), None),
        ];
        assert_eq!(ids(&find_overlaps(&list)), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_point_inside_interval_is_flagged() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), Some(60)),
            activity("b", "2024-05-01", Some("10:30"), None),
        ];
        assert_eq!(ids(&find_overlaps(&list)), vec!["a", "b"]);
    }

    #[test]
    fn test_same_start_different_end_is_flagged() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), Some(30)),
            activity("b", "2024-05-01", Some("10:00"), Some(45)),
        ];
        assert_eq!(ids(&find_overlaps(&list)), vec!["a", "b"]);
    }

    #[test]
    fn test_point_at_interval_start_is_not_flagged() {
        // The half-open test treats a point at an interval's start as touching.
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), None),
            activity("b", "2024-05-01", Some("10:00"), Some(45)),
        ];
        assert!(find_overlaps(&list).is_empty());
    }

    #[test]
    fn test_unscheduled_activities_never_flagged() {
        let list = vec![
            activity("a", "2024-05-01", None, Some(600)),
            activity("b", "2024-05-01", Some("bogus"), None),
            activity("c", "2024-05-01", None, None),
            activity("d", "2024-05-01", Some("10:00"), Some(30)),
        ];
        assert!(find_overlaps(&list).is_empty());
    }

    #[test]
    fn test_result_is_order_independent() {
        let mut list = vec![
            activity("a", "2024-05-01", Some("09:00"), Some(240)),
            activity("b", "2024-05-01", Some("12:00"), Some(30)),
            activity("c", "2024-05-01", Some("14:00"), Some(30)),
            activity("d", "2024-05-01", Some("14:15"), None),
        ];
        let forward = find_overlaps(&list);
        list.reverse();
        let backward = find_overlaps(&list);

        assert_eq!(forward, backward);
        assert_eq!(ids(&forward), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_maximum_duration_overlaps_later_activities() {
        let list = vec![
            activity("a", "2024-05-01", Some("10:00"), Some(u32::MAX)),
            activity("b", "2024-05-01", Some("23:00"), Some(30)),
            activity("c", "2024-05-01", Some("09:00"), Some(30)),
        ];
        assert_eq!(ids(&find_overlaps(&list)), vec!["a", "b"]);
    }
}
