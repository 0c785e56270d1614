//! File names for durable resends.
//!
//! A pending file is named after the UTC instant it becomes due, formatted
//! as `MM-dd-yyyy-HH-mm-ss`. Collisions get a `.N` suffix, which is ignored
//! when the name is parsed back.

use chrono::{DateTime, NaiveDateTime, Utc};

const FORMAT: &str = "%m-%d-%Y-%H-%M-%S";

/// Name stem for a file due at `at`.
pub(super) fn stem(at: DateTime<Utc>) -> String { at.format(FORMAT).to_string() }

/// Candidate name for the `attempt`th collision of `stem`.
pub(super) fn candidate(stem: &str, attempt: u32) -> String {
    match attempt {
        0 => stem.to_owned(),
        n => format!("{stem}.{n}"),
    }
}

/// Due time encoded in a pending file name, if it is one of ours.
pub(super) fn due_time(name: &str) -> Option<DateTime<Utc>> {
    let stem = name.split_once('.').map_or(name, |(stem, _)| stem);
    NaiveDateTime::parse_from_str(stem, FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn stems_follow_month_day_year_order() {
        let at = Utc
            .with_ymd_and_hms(2024, 3, 7, 14, 5, 9)
            .single()
            .expect("valid instant");
        assert_eq!(stem(at), "03-07-2024-14-05-09");
        assert_eq!(due_time("03-07-2024-14-05-09"), Some(at));
    }

    #[rstest]
    #[case("03-07-2024-14-05-09.1")]
    #[case("03-07-2024-14-05-09.17")]
    fn collision_suffix_is_ignored(#[case] name: &str) {
        assert!(due_time(name).is_some());
    }

    #[rstest]
    #[case("notes.txt")]
    #[case("13-40-2024-14-05-09")]
    #[case("")]
    fn foreign_names_do_not_parse(#[case] name: &str) {
        assert_eq!(due_time(name), None);
    }

    #[rstest]
    fn first_candidate_has_no_suffix() {
        assert_eq!(candidate("01-01-2025-00-00-00", 0), "01-01-2025-00-00-00");
        assert_eq!(candidate("01-01-2025-00-00-00", 2), "01-01-2025-00-00-00.2");
    }
}
