use chrono::{NaiveDate, TimeZone};

use crate::common::Message;

/// Contiguous run of messages sharing a calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup<'a> {
    pub date: NaiveDate,
    pub messages: &'a [Message],
}

/// Split an ordered snapshot into day runs. A new group starts whenever the
/// day in `tz` differs from the previous message's day, so a day that shows
/// up again after another day gets a second group.
pub fn group_by_day<'a, Tz: TimeZone>(messages: &'a [Message], tz: &Tz) -> Vec<DayGroup<'a>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut current: Option<NaiveDate> = None;

    for (index, message) in messages.iter().enumerate() {
        let date = message.created_at.with_timezone(tz).date_naive();
        match current {
            Some(day) if day == date => {}
            Some(day) => {
                groups.push(DayGroup {
                    date: day,
                    messages: &messages[start..index],
                });
                start = index;
                current = Some(date);
            }
            None => current = Some(date),
        }
    }

    if let Some(day) = current {
        groups.push(DayGroup {
            date: day,
            messages: &messages[start..],
        });
    }

    groups
}

/// Header text for a day group: "Today", "Yesterday", or e.g. "Monday, January 5".
pub fn day_header(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(date) {
        "Yesterday".to_string()
    } else {
        date.format("%A, %B %-d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn at(id: &str, rfc3339: &str) -> Message {
        Message {
            id: id.to_string(),
            sender: "Hana".to_string(),
            content: "hi".to_string(),
            created_at: rfc3339.parse::<chrono::DateTime<Utc>>().unwrap(),
        }
    }

    #[test]
    fn empty_snapshot_has_no_groups() {
        assert!(group_by_day(&[], &Utc).is_empty());
    }

    #[test]
    fn groups_follow_calendar_days() {
        let messages = vec![
            at("1", "2024-03-01T09:00:00Z"),
            at("2", "2024-03-01T23:59:00Z"),
            at("3", "2024-03-02T00:01:00Z"),
        ];
        let groups = group_by_day(&messages, &Utc);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(groups[0].messages.len(), 2);
        assert_eq!(groups[1].messages[0].id, "3");
    }

    #[test]
    fn grouping_uses_the_given_timezone() {
        let messages = vec![
            at("1", "2024-03-02T03:00:00Z"),
            at("2", "2024-03-02T06:00:00Z"),
        ];
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let groups = group_by_day(&messages, &tokyo);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

        // 22:00 on March 1st, then 01:00 on March 2nd
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let groups = group_by_day(&messages, &new_york);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn headers() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(day_header(today, today), "Today");
        assert_eq!(
            day_header(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(), today),
            "Yesterday"
        );
        assert_eq!(
            day_header(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), today),
            "Friday, January 5"
        );
    }
}
