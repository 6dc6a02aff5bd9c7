// Listening streak computation over the session log

use chrono::NaiveDate;
use serde::Serialize;

/// Streak figures shown on the progress screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreakSummary {
    /// Consecutive days ending today (or yesterday, if today hasn't been
    /// listened yet — the streak isn't broken until the day is over).
    pub current_days: u32,
    pub longest_days: u32,
    pub total_days: u32,
}

/// Compute streaks from the set of dates with at least one completed listen.
/// Input order doesn't matter; duplicates are tolerated.
pub fn compute_streaks(today: NaiveDate, listened: &[NaiveDate]) -> StreakSummary {
    let mut days: Vec<NaiveDate> = listened.iter().copied().filter(|d| *d <= today).collect();
    days.sort();
    days.dedup();

    if days.is_empty() {
        return StreakSummary::default();
    }

    let mut longest = 1u32;
    let mut run = 1u32;
    for pair in days.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            run += 1;
        } else {
            run = 1;
        }
        longest = longest.max(run);
    }

    let last = *days.last().expect("non-empty");
    let mut current = 0u32;
    if (today - last).num_days() <= 1 {
        current = 1;
        for pair in days.windows(2).rev() {
            if (pair[1] - pair[0]).num_days() == 1 {
                current += 1;
            } else {
                break;
            }
        }
    }

    StreakSummary {
        current_days: current,
        longest_days: longest,
        total_days: days.len() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_no_sessions_means_no_streak() {
        assert_eq!(compute_streaks(d("2026-08-06"), &[]), StreakSummary::default());
    }

    #[test]
    fn test_run_ending_today() {
        let dates = [d("2026-08-04"), d("2026-08-05"), d("2026-08-06")];
        let summary = compute_streaks(d("2026-08-06"), &dates);
        assert_eq!(summary.current_days, 3);
        assert_eq!(summary.longest_days, 3);
        assert_eq!(summary.total_days, 3);
    }

    #[test]
    fn test_run_ending_yesterday_still_counts() {
        let dates = [d("2026-08-04"), d("2026-08-05")];
        let summary = compute_streaks(d("2026-08-06"), &dates);
        assert_eq!(summary.current_days, 2);
    }

    #[test]
    fn test_gap_breaks_current_but_not_longest() {
        let dates = [
            d("2026-07-28"),
            d("2026-07-29"),
            d("2026-07-30"),
            d("2026-08-05"),
            d("2026-08-06"),
        ];
        let summary = compute_streaks(d("2026-08-06"), &dates);
        assert_eq!(summary.current_days, 2);
        assert_eq!(summary.longest_days, 3);
        assert_eq!(summary.total_days, 5);
    }

    #[test]
    fn test_stale_last_listen_resets_current() {
        let dates = [d("2026-07-30"), d("2026-07-31")];
        let summary = compute_streaks(d("2026-08-06"), &dates);
        assert_eq!(summary.current_days, 0);
        assert_eq!(summary.longest_days, 2);
    }

    #[test]
    fn test_duplicates_and_order_do_not_matter() {
        let dates = [d("2026-08-06"), d("2026-08-05"), d("2026-08-06")];
        let summary = compute_streaks(d("2026-08-06"), &dates);
        assert_eq!(summary.current_days, 2);
        assert_eq!(summary.total_days, 2);
    }

    #[test]
    fn test_future_dates_are_ignored() {
        let dates = [d("2026-08-06"), d("2026-09-01")];
        let summary = compute_streaks(d("2026-08-06"), &dates);
        assert_eq!(summary.current_days, 1);
        assert_eq!(summary.total_days, 1);
    }
}
