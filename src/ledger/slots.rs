use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use crate::utils::time::{date_key, local_to_utc};

use super::entities::{Coin, Settings};

/// Lays out a fresh day of untagged coins. Slot `i` starts `i * coin_duration` minutes after
/// `start_hour:00` local time of `date`. Slots whose times don't fit into a calendar date are
/// skipped.
pub fn generate_coins(date: NaiveDate, settings: &Settings, created_at: DateTime<Utc>) -> Vec<Coin> {
    let key = date_key(date);
    let day_start = date.and_time(NaiveTime::MIN);

    (0..settings.total_coins())
        .filter_map(|index| {
            let (start_time, end_time) = slot_bounds(day_start, settings, index)?;
            Some(Coin {
                id: Coin::make_id(&key, index),
                index,
                start_time,
                end_time,
                kind: None,
                description: String::new(),
                created_at,
                updated_at: None,
            })
        })
        .collect()
}

fn slot_bounds(
    day_start: NaiveDateTime,
    settings: &Settings,
    index: usize,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let duration = i64::from(settings.coin_duration);
    let offset = i64::try_from(index)
        .ok()?
        .checked_mul(duration)?
        .checked_add(i64::from(settings.start_hour).checked_mul(60)?)?;
    let start = day_start.checked_add_signed(TimeDelta::try_minutes(offset)?)?;
    let start_time = local_to_utc(start);
    let end_time = start_time.checked_add_signed(TimeDelta::try_minutes(duration)?)?;
    Some((start_time, end_time))
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, NaiveTime, Utc};

    use crate::ledger::entities::Settings;

    use super::generate_coins;

    #[test]
    fn test_generate_default_day() {
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let coins = generate_coins(date, &Settings::default(), Utc::now());

        assert_eq!(coins.len(), 34);
        assert_eq!(coins[0].id, "2018-07-04-0");
        assert_eq!(coins[33].id, "2018-07-04-33");

        let first_start = coins[0].start_time.with_timezone(&Local);
        let first_end = coins[0].end_time.with_timezone(&Local);
        assert_eq!(first_start.date_naive(), date);
        assert_eq!(first_start.time(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(first_end.time(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());

        let last_start = coins[33].start_time.with_timezone(&Local);
        assert_eq!(last_start.time(), NaiveTime::from_hms_opt(23, 30, 0).unwrap());

        for (index, coin) in coins.iter().enumerate() {
            assert_eq!(coin.index, index);
            assert_eq!(coin.kind, None);
            assert!(coin.description.is_empty());
        }
    }

    #[test]
    fn test_generate_slots_are_contiguous() {
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        let settings = Settings {
            start_hour: 9,
            end_hour: 12,
            coin_duration: 20,
            ..Settings::default()
        };
        let coins = generate_coins(date, &settings, Utc::now());

        assert_eq!(coins.len(), 9);
        for pair in coins.windows(2) {
            assert_eq!(pair[0].end_time, pair[1].start_time);
        }
    }

    #[test]
    fn test_generate_out_of_range_settings() {
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();

        let settings = Settings {
            start_hour: 0,
            end_hour: 100_000_000,
            coin_duration: 30,
            ..Settings::default()
        };
        assert!(generate_coins(date, &settings, Utc::now()).is_empty());

        let settings = Settings {
            start_hour: 4_000_000_000,
            end_hour: 4_000_000_001,
            coin_duration: 30,
            ..Settings::default()
        };
        assert_eq!(settings.total_coins(), 2);
        assert!(generate_coins(date, &settings, Utc::now()).is_empty());
    }
}
