//! Recurring poll timer driven by configuration

use async_trait::async_trait;
use bridge_config::{AuthorityConfig, ConfigStore};
use bridge_events::{AppEvent, EventEmitter, EventSender, ScheduleEvent};
use bridge_types::PollInterval;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Delay between arming the timer and its first tick
pub const DEFAULT_FIRST_DELAY: Duration = Duration::from_secs(60);

/// Work performed on every tick
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run_scheduled(&self);
}

#[derive(Debug)]
struct ActiveTimer {
    interval: PollInterval,
    handle: JoinHandle<()>,
}

/// Keeps at most one recurring timer alive for the configured authority
pub struct PollScheduler {
    job: Arc<dyn ScheduledJob>,
    timer: Mutex<Option<ActiveTimer>>,
    first_delay: Duration,
    tx: Option<EventSender>,
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("active", &self.active_interval())
            .field("first_delay", &self.first_delay)
            .finish_non_exhaustive()
    }
}

impl EventEmitter for PollScheduler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl PollScheduler {
    #[must_use]
    pub fn new(job: Arc<dyn ScheduledJob>) -> Self {
        Self {
            job,
            timer: Mutex::new(None),
            first_delay: DEFAULT_FIRST_DELAY,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_first_delay(mut self, delay: Duration) -> Self {
        self.first_delay = delay;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Bring the timer in line with `authority`.
    ///
    /// Any existing timer is cancelled first, so calling this repeatedly
    /// leaves exactly one timer when configured and none otherwise. A run
    /// already in flight is not interrupted. Must be called from within a
    /// tokio runtime.
    pub fn reconcile(&self, authority: &AuthorityConfig) {
        let mut slot = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.take();
        let had_timer = previous.is_some();
        if let Some(previous) = previous {
            previous.handle.abort();
        }

        if !authority.is_configured() {
            if had_timer {
                self.emit(AppEvent::Schedule(ScheduleEvent::Cleared));
            }
            return;
        }

        let interval = authority.interval;
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.job),
            interval,
            self.first_delay,
            self.tx.clone(),
        ));
        *slot = Some(ActiveTimer { interval, handle });
        drop(slot);

        self.emit(AppEvent::Schedule(ScheduleEvent::Armed {
            interval,
            first_run_in: self.first_delay,
        }));
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.active_interval().is_some()
    }

    /// Cadence of the live timer, if any
    #[must_use]
    pub fn active_interval(&self) -> Option<PollInterval> {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|timer| timer.interval)
    }

    /// Cancel the timer without touching configuration
    pub fn shutdown(&self) {
        if let Some(timer) = self.timer.lock().unwrap_or_else(PoisonError::into_inner).take() {
            timer.handle.abort();
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn tick_loop(job: Arc<dyn ScheduledJob>, interval: PollInterval, first_delay: Duration, tx: Option<EventSender>) {
    let mut ticks = interval_at(Instant::now() + first_delay, interval.period());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        tx.emit(AppEvent::Schedule(ScheduleEvent::Fired { interval }));
        // Detached so cancelling the timer never cuts a run short
        let job = Arc::clone(&job);
        tokio::spawn(async move { job.run_scheduled().await });
    }
}

/// Reconcile `scheduler` now and again whenever the authority section changes
///
/// The returned task ends when the store is dropped.
pub fn spawn_config_watcher(store: &ConfigStore, scheduler: Arc<PollScheduler>) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    let mut current = rx.borrow_and_update().authority.clone();
    scheduler.reconcile(&current);

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().authority.clone();
            if next != current {
                scheduler.reconcile(&next);
                current = next;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_config::Config;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl ScheduledJob for Counter {
        async fn run_scheduled(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn runs(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn configured(interval: PollInterval) -> AuthorityConfig {
        AuthorityConfig {
            url: "https://master.example.com".into(),
            secret: "s3cret".into(),
            interval,
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_after_delay_then_every_period() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new(counter.clone());
        scheduler.reconcile(&configured(PollInterval::Hourly));

        tokio::time::sleep(Duration::from_secs(59)).await;
        settle().await;
        assert_eq!(counter.runs(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(counter.runs(), 1);

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        settle().await;
        assert_eq!(counter.runs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_reconcile_keeps_one_timer() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new(counter.clone());
        for _ in 0..5 {
            scheduler.reconcile(&configured(PollInterval::Hourly));
        }

        tokio::time::sleep(Duration::from_secs(61)).await;
        settle().await;
        assert_eq!(counter.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_authority_clears_timer() {
        let counter = Arc::new(Counter::default());
        let scheduler = PollScheduler::new(counter.clone());
        scheduler.reconcile(&configured(PollInterval::Daily));
        assert_eq!(scheduler.active_interval(), Some(PollInterval::Daily));

        scheduler.reconcile(&AuthorityConfig::default());
        assert!(!scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_secs(2 * 24 * 60 * 60)).await;
        settle().await;
        assert_eq!(counter.runs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_follows_interval_changes() {
        let counter = Arc::new(Counter::default());
        let scheduler = Arc::new(PollScheduler::new(counter.clone()));
        let store = ConfigStore::in_memory(Config::default());
        let watcher = spawn_config_watcher(&store, Arc::clone(&scheduler));
        assert!(!scheduler.is_scheduled());

        store
            .update(|c| {
                c.authority = configured(PollInterval::TwiceDaily);
                Ok(())
            })
            .await
            .unwrap();
        settle().await;
        assert_eq!(scheduler.active_interval(), Some(PollInterval::TwiceDaily));

        store
            .update(|c| {
                c.authority.interval = PollInterval::Hourly;
                Ok(())
            })
            .await
            .unwrap();
        settle().await;
        assert_eq!(scheduler.active_interval(), Some(PollInterval::Hourly));

        tokio::time::sleep(Duration::from_secs(61 + 60 * 60)).await;
        settle().await;
        assert_eq!(counter.runs(), 2);

        watcher.abort();
    }
}
