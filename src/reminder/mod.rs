//! Reminds the user to tag coins as they run out. The loop walks the day's coin end times in order
//! and notifies once per coin.

pub mod shutdown;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{ledger::entities::Coin, utils::clock::Clock};

/// Receives a coin right after it ends.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn notify(&mut self, coin: &Coin) -> Result<()>;
}

/// First coin that ends strictly after `cursor`.
pub fn next_ending(coins: &[Coin], cursor: DateTime<Utc>) -> Option<&Coin> {
    coins
        .iter()
        .filter(|v| v.end_time > cursor)
        .min_by_key(|v| v.end_time)
}

pub struct ReminderModule<N> {
    coins: Vec<Coin>,
    notifier: N,
    shutdown: CancellationToken,
    time_provider: Box<dyn Clock>,
}

impl<N: Notifier> ReminderModule<N> {
    pub fn new(
        coins: Vec<Coin>,
        notifier: N,
        shutdown: CancellationToken,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            coins,
            notifier,
            shutdown,
            time_provider,
        }
    }

    /// Executes the reminder event loop. Returns amount of sent notifications.
    pub async fn run(mut self) -> Result<usize> {
        let mut cursor = self.time_provider.time();
        let mut sent = 0;

        while let Some(coin) = next_ending(&self.coins, cursor).cloned() {
            let wait = (coin.end_time - self.time_provider.time())
                .to_std()
                .unwrap_or_default();
            debug!("Next reminder for {} in {wait:?}", coin.id);
            let deadline = self.time_provider.instant() + wait;

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Reminders cancelled after {sent} notifications");
                    return Ok(sent)
                }
                _ = self.time_provider.sleep_until(deadline) => ()
            }

            match self.notifier.notify(&coin) {
                Ok(_) => sent += 1,
                Err(e) => error!("Failed to notify about {}: {e:?}", coin.id),
            }
            cursor = coin.end_time;
        }

        info!("All coins of the day have ended");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        ledger::{entities::Settings, slots::generate_coins},
        reminder::{next_ending, MockNotifier, ReminderModule},
        utils::{clock::Clock, logging::TEST_LOGGING, time::local_to_utc},
    };

    #[derive(Clone)]
    struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap()
    }

    fn short_day() -> Settings {
        Settings {
            start_hour: 9,
            end_hour: 11,
            coin_duration: 30,
            ..Settings::default()
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        local_to_utc(test_date().and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap()))
    }

    #[test]
    fn test_next_ending() {
        let coins = generate_coins(test_date(), &short_day(), Utc::now());

        assert_eq!(next_ending(&coins, at(8, 0)).map(|v| v.index), Some(0));
        assert_eq!(next_ending(&coins, at(9, 30)).map(|v| v.index), Some(1));
        assert_eq!(next_ending(&coins, at(9, 45)).map(|v| v.index), Some(1));
        assert!(next_ending(&coins, at(11, 0)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reminders_for_remaining_coins() -> Result<()> {
        *TEST_LOGGING;
        let coins = generate_coins(test_date(), &short_day(), Utc::now());

        let mut notifier = MockNotifier::new();
        let mut expected = vec![1usize, 2, 3];
        notifier
            .expect_notify()
            .times(3)
            .returning(move |coin| {
                assert_eq!(coin.index, expected.remove(0));
                Ok(())
            });

        let clock = TestClock {
            start_time: at(9, 40),
            reference: Instant::now(),
        };
        let module = ReminderModule::new(coins, notifier, CancellationToken::new(), Box::new(clock));

        assert_eq!(module.run().await?, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_notification_does_not_stop_loop() -> Result<()> {
        *TEST_LOGGING;
        let coins = generate_coins(test_date(), &short_day(), Utc::now());

        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .times(4)
            .returning(|coin| {
                if coin.index == 0 {
                    Err(anyhow!("terminal closed"))
                } else {
                    Ok(())
                }
            });

        let clock = TestClock {
            start_time: at(8, 0),
            reference: Instant::now(),
        };
        let module = ReminderModule::new(coins, notifier, CancellationToken::new(), Box::new(clock));

        assert_eq!(module.run().await?, 3);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_reminders() -> Result<()> {
        *TEST_LOGGING;
        let coins = generate_coins(test_date(), &short_day(), Utc::now());

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        let token = CancellationToken::new();
        token.cancel();
        let clock = TestClock {
            start_time: at(8, 0),
            reference: Instant::now(),
        };
        let module = ReminderModule::new(coins, notifier, token, Box::new(clock));

        assert_eq!(module.run().await?, 0);
        Ok(())
    }
}
