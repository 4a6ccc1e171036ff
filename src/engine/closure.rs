use crate::calendar::MINUTES_PER_DAY;
use crate::model::ClosureInterval;

/// First closure in `closures` that covers `ramp` at `minute_of_day`.
///
/// Closures must already be filtered to the booking type being evaluated.
pub fn resolve(closures: &[ClosureInterval], ramp: u32, minute_of_day: u32) -> Option<&ClosureInterval> {
    closures
        .iter()
        .find(|c| matches_ramp(c, ramp) && covers_minute(c, minute_of_day))
}

fn matches_ramp(closure: &ClosureInterval, ramp: u32) -> bool {
    closure.ramp_number.is_none_or(|r| r == ramp)
}

fn covers_minute(closure: &ClosureInterval, minute_of_day: u32) -> bool {
    let Some(start) = closure.start_minute else {
        return true; // whole day
    };
    minute_of_day >= start && minute_of_day < start.saturating_add(effective_duration(closure))
}

/// Closure length in minutes, never past midnight; open-ended closures run to midnight.
pub fn effective_duration(closure: &ClosureInterval) -> u32 {
    match (closure.start_minute, closure.duration_minutes) {
        (None, _) => MINUTES_PER_DAY,
        (Some(start), Some(d)) => d.min(MINUTES_PER_DAY.saturating_sub(start)),
        (Some(start), None) => MINUTES_PER_DAY.saturating_sub(start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClosureScope;
    use chrono::NaiveDate;
    use ulid::Ulid;

    fn closure(ramp: Option<u32>, start: Option<u32>, duration: Option<u32>, reason: &str) -> ClosureInterval {
        ClosureInterval {
            id: Ulid::new(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            scope: ClosureScope::Both,
            ramp_number: ramp,
            start_minute: start,
            duration_minutes: duration,
            reason: Some(reason.into()),
        }
    }

    #[test]
    fn whole_day_all_ramps() {
        let cs = vec![closure(None, None, None, "Helligdag")];
        for minute in [0, 480, 1439] {
            assert_eq!(resolve(&cs, 9, minute).unwrap().reason.as_deref(), Some("Helligdag"));
        }
    }

    #[test]
    fn whole_day_ignores_duration() {
        let cs = vec![closure(None, None, Some(30), "x")];
        assert!(resolve(&cs, 9, 900).is_some());
    }

    #[test]
    fn ramp_specific() {
        let cs = vec![closure(Some(9), None, None, "Rampe 9 defekt")];
        assert!(resolve(&cs, 9, 600).is_some());
        assert!(resolve(&cs, 8, 600).is_none());
    }

    #[test]
    fn timed_interval_is_half_open() {
        let cs = vec![closure(None, Some(600), Some(60), "x")];
        assert!(resolve(&cs, 9, 599).is_none());
        assert!(resolve(&cs, 9, 600).is_some());
        assert!(resolve(&cs, 9, 659).is_some());
        assert!(resolve(&cs, 9, 660).is_none());
    }

    #[test]
    fn open_ended_runs_to_midnight() {
        let cs = vec![closure(None, Some(14 * 60), None, "x")];
        assert!(resolve(&cs, 9, 14 * 60 - 1).is_none());
        assert!(resolve(&cs, 9, 16 * 60).is_some());
        assert!(resolve(&cs, 9, MINUTES_PER_DAY - 1).is_some());
        assert_eq!(effective_duration(&cs[0]), 10 * 60);
    }

    #[test]
    fn duration_past_midnight_stops_at_midnight() {
        let cs = vec![closure(None, Some(23 * 60), Some(180), "natt")];
        assert_eq!(effective_duration(&cs[0]), 60);
        assert!(resolve(&cs, 9, 23 * 60 + 30).is_some());
        assert!(resolve(&cs, 9, MINUTES_PER_DAY - 1).is_some());
        assert!(resolve(&cs, 9, 60).is_none());
    }

    #[test]
    fn huge_stored_duration_does_not_overflow() {
        let cs = vec![closure(None, Some(600), Some(u32::MAX), "x")];
        assert_eq!(effective_duration(&cs[0]), MINUTES_PER_DAY - 600);
        assert!(resolve(&cs, 9, 599).is_none());
        assert!(resolve(&cs, 9, 700).is_some());
        assert!(resolve(&cs, 9, MINUTES_PER_DAY - 1).is_some());

        // A corrupt start past the end of the day covers nothing
        let cs = vec![closure(None, Some(u32::MAX), Some(u32::MAX), "x")];
        assert!(resolve(&cs, 9, 700).is_none());
    }

    #[test]
    fn first_match_wins() {
        let cs = vec![
            closure(Some(8), None, None, "first-other-ramp"),
            closure(None, Some(600), Some(120), "second"),
            closure(Some(9), None, None, "third"),
        ];
        assert_eq!(resolve(&cs, 9, 630).unwrap().reason.as_deref(), Some("second"));
        assert_eq!(resolve(&cs, 9, 480).unwrap().reason.as_deref(), Some("third"));
    }
}
