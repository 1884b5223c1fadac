use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// This is the standard way of converting a date to a ledger key in goldcoin.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Resolves a wall-clock time of the local timezone into an instant.
///
/// Times skipped by a DST jump are moved forward by an hour, which is where a wall clock lands
/// after the jump.
pub fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            naive
                .checked_add_signed(Duration::hours(1))
                .and_then(|shifted| Local.from_local_datetime(&shifted).earliest())
        })
        .map(|v| v.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

pub fn local_date(moment: DateTime<Utc>) -> NaiveDate {
    moment.with_timezone(&Local).date_naive()
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, NaiveTime};

    use super::{date_key, local_to_utc};

    #[test]
    fn test_date_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date_key(date), "2024-03-05");
    }

    #[test]
    fn test_local_to_utc_keeps_wall_clock() {
        let naive = NaiveDate::from_ymd_opt(2018, 7, 4)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        let instant = local_to_utc(naive);
        assert_eq!(instant.with_timezone(&Local).naive_local(), naive);
    }
}
