//! Sweeper - 定期 sweep（stuck 回収 + retention による削除）
//!
//! # フロー（1 回の sweep）
//! 1. store の snapshot を取る
//! 2. `stuck_after` より古い Pending を processor に再 dispatch
//! 3. `retention` より古い item を status に関係なく削除
//!
//! 再 dispatch と元の dispatch が競合しても、processor 側の claim で 1 回に絞られます。
//!
//! # SweepTimer
//! - `sweep_interval` ごとに `Sweeper::tick` を呼ぶ（初回は即時）
//! - sweep 中の panic はログに出して握りつぶし、次の tick も予定どおり動く
//! - watch channel で停止（WorkerGroup と同じ形）

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::processor::{Processor, panic_message};
use super::{QueueStatus, QueueStore};
use crate::ports::Clock;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending items re-dispatched to the processor.
    pub recovered: usize,
    /// Items removed for exceeding retention.
    pub evicted: usize,
}

pub struct Sweeper {
    store: Arc<QueueStore>,
    processor: Arc<Processor>,
    clock: Arc<dyn Clock>,
    stuck_after: chrono::Duration,
    retention: chrono::Duration,
}

impl Sweeper {
    pub fn new(
        store: Arc<QueueStore>,
        processor: Arc<Processor>,
        clock: Arc<dyn Clock>,
        stuck_after: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            processor,
            clock,
            stuck_after: to_chrono(stuck_after),
            retention: to_chrono(retention),
        }
    }

    /// One pass over a snapshot of the store.
    ///
    /// - Pending items older than `stuck_after` are dispatched again. `process_one`
    ///   skips anything no longer Pending, so racing the original dispatch is harmless.
    /// - Items older than `retention` are removed whatever their status.
    pub fn run_once(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for item in self.store.scan() {
            let age = item.age(now);
            if item.status() == QueueStatus::Pending && age > self.stuck_after {
                tracing::info!(queue_id = %item.id(), age_secs = age.num_seconds(), "re-dispatching stuck queue item");
                self.processor.dispatch(item.id());
                report.recovered += 1;
            }
            if age > self.retention && self.store.remove(item.id()) {
                tracing::debug!(queue_id = %item.id(), status = %item.status(), "evicted queue item");
                report.evicted += 1;
            }
        }

        if report.evicted > 0 {
            tracing::info!(count = report.evicted, "cleaned up old queue items");
        }
        report
    }

    /// `run_once`, but a panic is logged instead of propagated.
    pub fn tick(&self) -> Option<SweepReport> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.run_once())) {
            Ok(report) => Some(report),
            Err(panic) => {
                tracing::error!(error = panic_message(&*panic), "error sweeping comment queue");
                None
            }
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

/// Timer handle.
/// - `request_shutdown` か handle の drop でループが止まる
/// - `shutdown_and_join` で終了を待てる
pub struct SweepTimer {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweepTimer {
    /// Spawn the timer on `runtime`. The first sweep runs immediately.
    pub fn spawn(sweeper: Arc<Sweeper>, period: Duration, runtime: &Handle) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = runtime.spawn(timer_loop(sweeper, period, shutdown_rx));
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}

async fn timer_loop(sweeper: Arc<Sweeper>, period: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender が drop された場合も終了
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => {
                sweeper.tick();
            }
        }
    }

    tracing::debug!("comment queue sweep timer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateCommentRequest, QueueId};
    use crate::impls::InMemoryCommentStore;
    use crate::ports::ManualClock;
    use crate::queue::QueueItem;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use ulid::Ulid;

    const PERIOD: Duration = Duration::from_secs(300);

    /// 最初の `now()` だけ panic する時計（sweep の失敗を再現）
    struct FailOnceClock {
        inner: ManualClock,
        armed: AtomicBool,
        calls: AtomicUsize,
    }

    impl Clock for FailOnceClock {
        fn now(&self) -> DateTime<Utc> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.armed.swap(false, Ordering::SeqCst) {
                panic!("clock source unavailable");
            }
            self.inner.now()
        }
    }

    struct Fixture {
        store: Arc<QueueStore>,
        clock: ManualClock,
        sweep_clock: Arc<FailOnceClock>,
        sweeper: Sweeper,
    }

    /// `fail_first`: 最初の sweep を panic させる
    fn fixture(fail_first: bool) -> Fixture {
        let store = Arc::new(QueueStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        let clock_port: Arc<dyn Clock> = Arc::new(clock.clone());
        let sweep_clock = Arc::new(FailOnceClock {
            inner: clock.clone(),
            armed: AtomicBool::new(fail_first),
            calls: AtomicUsize::new(0),
        });
        let processor = Arc::new(Processor::new(
            Arc::clone(&store),
            Arc::new(InMemoryCommentStore::with_clock(Arc::clone(&clock_port))),
            clock_port,
            Handle::current(),
        ));
        let sweeper = Sweeper::new(
            Arc::clone(&store),
            processor,
            sweep_clock.clone(),
            Duration::from_secs(60),
            Duration::from_secs(3600),
        );
        Fixture {
            store,
            clock,
            sweep_clock,
            sweeper,
        }
    }

    fn insert_pending(f: &Fixture) -> QueueId {
        insert_pending_into(&f.store, &f.clock)
    }

    fn insert_pending_into(store: &QueueStore, clock: &ManualClock) -> QueueId {
        let item = QueueItem::new(
            QueueId::from_ulid(Ulid::new()),
            CreateCommentRequest::new("Alice", "a@x.com", "hi"),
            clock.now(),
        );
        let id = item.id();
        store.insert(item).unwrap();
        id
    }

    #[tokio::test]
    async fn fresh_pending_items_are_left_alone() {
        let f = fixture(false);
        insert_pending(&f);
        f.clock.advance(chrono::Duration::seconds(30));

        assert_eq!(f.sweeper.run_once(), SweepReport::default());
    }

    #[tokio::test]
    async fn stuck_pending_item_is_recovered() {
        let f = fixture(false);
        let id = insert_pending(&f);
        f.clock.advance(chrono::Duration::seconds(61));

        let report = f.sweeper.run_once();
        assert_eq!(report.recovered, 1);
        assert_eq!(report.evicted, 0);

        for _ in 0..100 {
            if f.store.get(id).is_some_and(|item| item.is_terminal()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(f.store.get(id).unwrap().status(), QueueStatus::Completed);
    }

    #[tokio::test]
    async fn old_items_are_evicted_whatever_their_status() {
        let f = fixture(false);
        let pending = insert_pending(&f);
        let processing = insert_pending(&f);
        f.store
            .update(processing, |item| item.start_processing())
            .unwrap()
            .unwrap();
        f.clock.advance(chrono::Duration::minutes(30));
        let young = insert_pending(&f);
        f.clock.advance(chrono::Duration::minutes(31));

        let report = f.sweeper.run_once();

        assert_eq!(report.evicted, 2);
        assert!(f.store.get(pending).is_none());
        assert!(f.store.get(processing).is_none());
        assert!(f.store.get(young).is_some());
    }

    #[tokio::test]
    async fn failed_sweep_is_swallowed_and_next_one_works() {
        let f = fixture(true);
        let old = insert_pending(&f);
        f.clock.advance(chrono::Duration::hours(2));

        assert_eq!(f.sweeper.tick(), None);
        assert!(f.store.get(old).is_some());

        let report = f.sweeper.tick().unwrap();
        assert_eq!(report.evicted, 1);
        assert!(f.store.get(old).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_keeps_running_after_a_failed_sweep() {
        let Fixture { store, clock, sweep_clock, sweeper } = fixture(true);
        let sweeper = Arc::new(sweeper);
        let timer = SweepTimer::spawn(Arc::clone(&sweeper), PERIOD, &Handle::current());

        // t=0 の初回 sweep は panic する
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sweep_clock.calls.load(Ordering::SeqCst), 1);

        let id = insert_pending_into(&store, &clock);
        clock.advance(chrono::Duration::hours(2));
        tokio::time::sleep(PERIOD).await;

        assert!(store.get(id).is_none());
        timer.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_on_schedule_and_stops() {
        let Fixture { store, clock, sweep_clock, sweeper } = fixture(false);
        let sweeper = Arc::new(sweeper);
        let timer = SweepTimer::spawn(Arc::clone(&sweeper), PERIOD, &Handle::current());

        // 初回 sweep（t=0）が空の store に対して終わるのを待つ
        tokio::time::sleep(Duration::from_secs(1)).await;
        let first = insert_pending_into(&store, &clock);
        clock.advance(chrono::Duration::hours(2));

        // 次の tick (t=300s) まではそのまま
        tokio::time::sleep(PERIOD - Duration::from_secs(2)).await;
        assert!(store.get(first).is_some());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.get(first).is_none());

        timer.shutdown_and_join().await;
        let sweeps = sweep_clock.calls.load(Ordering::SeqCst);
        let second = insert_pending_into(&store, &clock);
        clock.advance(chrono::Duration::hours(2));
        tokio::time::sleep(PERIOD * 3).await;

        assert!(store.get(second).is_some());
        assert_eq!(sweep_clock.calls.load(Ordering::SeqCst), sweeps);
    }
}
