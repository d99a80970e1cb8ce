use crate::application::resolver::PaymentStatusResolver;
use crate::domain::reference::ReferencePair;
use crate::domain::settlement::SettlementState;
use crate::error::{Result, StatusError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Polling parameters for a [`Watch`].
///
/// The overall timeout is `max_attempts × interval_ms`, counted in attempts
/// rather than wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: 3000,
            max_attempts: 20,
        }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(StatusError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One completed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// 1-based attempt number.
    pub attempt: u32,
    pub state: SettlementState,
}

/// How a watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The backend reported a terminal state.
    Settled(SettlementState),
    /// The attempt budget ran out without a terminal state.
    TimedOut { attempts: u32 },
    /// The caller stopped the watch.
    Cancelled,
}

impl WatchOutcome {
    /// The state shown to the user. A timeout reads as `Failed`, the same as a
    /// processor-reported failure; a cancelled watch shows nothing.
    pub fn presented_state(&self) -> Option<SettlementState> {
        match self {
            WatchOutcome::Settled(state) => Some(*state),
            WatchOutcome::TimedOut { .. } => Some(SettlementState::Failed),
            WatchOutcome::Cancelled => None,
        }
    }
}

/// Progress of one watch. Owned by the watch and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSession {
    pub references: ReferencePair,
    pub state: SettlementState,
    pub attempts: u32,
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Cooperative stop signal shared between a watch and its owner.
///
/// Stopping is idempotent and may happen after the watch has already ended.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once the stop flag is raised.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        let raised = *rx.borrow_and_update();
        if raised {
            return;
        }
        if rx.changed().await.is_err() {
            // Every handle is gone, so nobody can stop us any more.
            std::future::pending::<()>().await;
        }
    }
}

type TickHook = Box<dyn FnMut(u32, SettlementState) + Send>;
type TerminalHook = Box<dyn FnOnce(SettlementState) + Send>;

/// A finite, pull-driven sequence of polls for one reference pair.
///
/// Each call to [`Watch::next`] sleeps for the configured interval, performs
/// one resolution and yields it. It ends on a terminal state or once
/// `max_attempts` polls have been made; raising the [`StopHandle`] ends it
/// early. A finished watch cannot be restarted.
///
/// Hooks run inline on the polling task and must not block.
pub struct Watch {
    resolver: PaymentStatusResolver,
    session: PollSession,
    stop: StopHandle,
    stop_rx: watch::Receiver<bool>,
    on_tick: Option<TickHook>,
    on_terminal: Option<TerminalHook>,
    outcome: Option<WatchOutcome>,
}

impl Watch {
    pub fn new(
        resolver: PaymentStatusResolver,
        references: ReferencePair,
        config: WatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (stop, stop_rx) = StopHandle::new();
        Ok(Self {
            resolver,
            session: PollSession {
                references,
                state: SettlementState::Unknown,
                attempts: 0,
                interval: config.interval(),
                max_attempts: config.max_attempts,
            },
            stop,
            stop_rx,
            on_tick: None,
            on_terminal: None,
            outcome: None,
        })
    }

    /// Called with `(attempt, state)` after every poll.
    pub fn on_tick(mut self, hook: impl FnMut(u32, SettlementState) + Send + 'static) -> Self {
        self.on_tick = Some(Box::new(hook));
        self
    }

    /// Called exactly once when the watch settles or times out. Never called
    /// for a cancelled watch.
    pub fn on_terminal(mut self, hook: impl FnOnce(SettlementState) + Send + 'static) -> Self {
        self.on_terminal = Some(Box::new(hook));
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn session(&self) -> &PollSession {
        &self.session
    }

    /// `None` while the watch is still running.
    pub fn outcome(&self) -> Option<WatchOutcome> {
        self.outcome
    }

    /// Waits one interval, polls once and yields the result.
    ///
    /// Returns `None` once the watch has ended. A lookup already in flight
    /// when the watch is stopped is allowed to finish, but its result is
    /// dropped.
    pub async fn next(&mut self) -> Option<Tick> {
        if self.outcome.is_some() {
            return None;
        }
        if self.stop.is_stopped() {
            return self.cancel();
        }

        let mut stop_rx = self.stop_rx.clone();
        let interrupted = tokio::select! {
            biased;
            _ = stopped(&mut stop_rx) => true,
            _ = tokio::time::sleep(self.session.interval) => false,
        };
        if interrupted {
            return self.cancel();
        }

        let attempt = self.session.attempts + 1;
        let state = match self.resolver.resolve(&self.session.references).await {
            Ok(resolution) => resolution.state,
            Err(e) => {
                warn!(attempt, error = %e, "lookup failed, counting attempt as unknown");
                SettlementState::Unknown
            }
        };

        if self.stop.is_stopped() {
            debug!(attempt, "watch stopped during lookup, discarding result");
            return self.cancel();
        }

        self.session.attempts = attempt;
        self.session.state = state;
        debug!(references = %self.session.references, attempt, %state, "poll");

        if let Some(hook) = self.on_tick.as_mut() {
            hook(attempt, state);
        }

        if self.stop.is_stopped() {
            self.cancel();
        } else if state.is_terminal() {
            self.finish(WatchOutcome::Settled(state));
        } else if attempt >= self.session.max_attempts {
            self.finish(WatchOutcome::TimedOut { attempts: attempt });
        }

        Some(Tick { attempt, state })
    }

    /// Drives the watch to completion.
    pub async fn run(mut self) -> WatchOutcome {
        while self.next().await.is_some() {}
        self.outcome.unwrap_or(WatchOutcome::Cancelled)
    }

    /// Runs the watch on its own tokio task.
    pub fn spawn(self) -> WatchTask {
        let stop = self.stop_handle();
        let join = tokio::spawn(self.run());
        WatchTask { stop, join }
    }

    fn finish(&mut self, outcome: WatchOutcome) {
        info!(references = %self.session.references, ?outcome, "watch finished");
        self.outcome = Some(outcome);
        if let (Some(state), Some(hook)) = (outcome.presented_state(), self.on_terminal.take()) {
            hook(state);
        }
    }

    fn cancel(&mut self) -> Option<Tick> {
        if self.outcome.is_none() {
            info!(
                references = %self.session.references,
                attempts = self.session.attempts,
                "watch cancelled"
            );
            self.outcome = Some(WatchOutcome::Cancelled);
        }
        None
    }
}

/// A watch running on a background task.
pub struct WatchTask {
    stop: StopHandle,
    join: JoinHandle<WatchOutcome>,
}

impl WatchTask {
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Waits for the task to end.
    pub async fn outcome(self) -> Result<WatchOutcome> {
        Ok(self.join.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::PaymentLookup;
    use crate::domain::record::{RecordOrigin, StatusRecord};
    use crate::domain::reference::{OrderReference, PaymentReference};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Clone, Copy)]
    enum Step {
        Status(&'static str),
        Offline,
        Missing,
    }

    /// Plays back a fixed list of payment lookups; the last step repeats.
    struct ScriptedLookup {
        steps: Mutex<Vec<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedLookup {
        fn new(steps: &[Step]) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.to_vec()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentLookup for ScriptedLookup {
        async fn get_by_payment_reference(
            &self,
            _reference: &PaymentReference,
        ) -> Result<Option<StatusRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = {
                let mut steps = self.steps.lock().unwrap();
                if steps.len() > 1 {
                    steps.remove(0)
                } else {
                    steps[0]
                }
            };
            match step {
                Step::Status(raw) => Ok(Some(StatusRecord::new(RecordOrigin::Payment, raw))),
                Step::Offline => Err(StatusError::LookupUnavailable("connection reset".into())),
                Step::Missing => Ok(None),
            }
        }

        async fn get_by_order_reference(
            &self,
            _reference: &OrderReference,
        ) -> Result<Option<StatusRecord>> {
            Ok(None)
        }
    }

    fn fast(max_attempts: u32) -> WatchConfig {
        WatchConfig {
            interval_ms: 1,
            max_attempts,
        }
    }

    fn watch_over(lookup: Arc<ScriptedLookup>, config: WatchConfig) -> Watch {
        PaymentStatusResolver::new(lookup)
            .watch(Some("pay_1"), None, config)
            .unwrap()
    }

    #[test]
    fn test_watch_config_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert_eq!(config.max_attempts, 20);

        let partial: WatchConfig = toml::from_str("interval_ms = 500").unwrap();
        assert_eq!(partial.interval_ms, 500);
        assert_eq!(partial.max_attempts, 20);
    }

    #[test]
    fn test_watch_rejects_bad_input() {
        let resolver = PaymentStatusResolver::new(ScriptedLookup::new(&[Step::Missing]));
        assert!(matches!(
            resolver.watch(None, Some(""), WatchConfig::default()),
            Err(StatusError::InvalidReference)
        ));
        assert!(matches!(
            resolver.watch(Some("pay_1"), None, fast(0)),
            Err(StatusError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_ticks_follow_attempt_order() {
        let lookup = ScriptedLookup::new(&[
            Step::Status("pending"),
            Step::Status("authorized"),
            Step::Missing,
            Step::Status("captured"),
        ]);
        let mut watch = watch_over(lookup.clone(), fast(20));

        let mut ticks = Vec::new();
        while let Some(tick) = watch.next().await {
            assert_eq!(lookup.calls(), tick.attempt as usize);
            ticks.push(tick);
        }

        let attempts: Vec<u32> = ticks.iter().map(|t| t.attempt).collect();
        let states: Vec<SettlementState> = ticks.iter().map(|t| t.state).collect();
        assert_eq!(attempts, [1, 2, 3, 4]);
        assert_eq!(
            states,
            [
                SettlementState::Pending,
                SettlementState::Processing,
                SettlementState::Unknown,
                SettlementState::Succeeded,
            ]
        );
        assert_eq!(watch.session().attempts, 4);
        assert_eq!(watch.session().state, SettlementState::Succeeded);
    }

    #[tokio::test]
    async fn test_always_pending_times_out_once() {
        let lookup = ScriptedLookup::new(&[Step::Status("pending")]);
        let terminal = Arc::new(Mutex::new(Vec::new()));
        let ticks = Arc::new(AtomicUsize::new(0));

        let seen = terminal.clone();
        let counted = ticks.clone();
        let outcome = watch_over(lookup.clone(), fast(5))
            .on_tick(move |_, _| {
                counted.fetch_add(1, Ordering::SeqCst);
            })
            .on_terminal(move |state| seen.lock().unwrap().push(state))
            .run()
            .await;

        assert_eq!(outcome, WatchOutcome::TimedOut { attempts: 5 });
        assert_eq!(outcome.presented_state(), Some(SettlementState::Failed));
        assert_eq!(lookup.calls(), 5);
        assert_eq!(ticks.load(Ordering::SeqCst), 5);
        assert_eq!(*terminal.lock().unwrap(), [SettlementState::Failed]);
    }

    #[tokio::test]
    async fn test_terminal_state_stops_polling() {
        let lookup = ScriptedLookup::new(&[
            Step::Status("pending"),
            Step::Status("pending"),
            Step::Status("captured"),
        ]);
        let terminal = Arc::new(Mutex::new(Vec::new()));
        let seen = terminal.clone();
        let mut watch = watch_over(lookup.clone(), fast(20))
            .on_terminal(move |state| seen.lock().unwrap().push(state));

        let mut count = 0;
        while watch.next().await.is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(watch.outcome(), Some(WatchOutcome::Settled(SettlementState::Succeeded)));

        // Polling a finished watch performs no further lookup.
        assert!(watch.next().await.is_none());
        assert_eq!(lookup.calls(), 3);
        assert_eq!(*terminal.lock().unwrap(), [SettlementState::Succeeded]);
    }

    #[tokio::test]
    async fn test_stop_from_tick_hook_suppresses_terminal_event() {
        let lookup = ScriptedLookup::new(&[Step::Status("captured")]);
        let fired = Arc::new(AtomicUsize::new(0));
        let counted = fired.clone();
        let watch = watch_over(lookup.clone(), fast(20));
        let stop = watch.stop_handle();
        let mut watch = watch
            .on_tick(move |_, _| stop.stop())
            .on_terminal(move |_| {
                counted.fetch_add(1, Ordering::SeqCst);
            });

        // The terminal tick is still yielded, but the stop wins over settling.
        let tick = watch.next().await;
        assert_eq!(tick.map(|t| t.state), Some(SettlementState::Succeeded));
        assert!(watch.next().await.is_none());

        assert_eq!(watch.outcome(), Some(WatchOutcome::Cancelled));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_first_tick() {
        let lookup = ScriptedLookup::new(&[Step::Status("captured")]);
        let fired = Arc::new(AtomicUsize::new(0));
        let counted = fired.clone();
        let watch = watch_over(lookup.clone(), fast(20)).on_terminal(move |_| {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        watch.stop_handle().stop();
        assert_eq!(watch.run().await, WatchOutcome::Cancelled);
        assert_eq!(lookup.calls(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_spawned_watch_while_sleeping() {
        let lookup = ScriptedLookup::new(&[Step::Status("pending")]);
        let config = WatchConfig {
            interval_ms: 60_000,
            max_attempts: 20,
        };
        let task = watch_over(lookup.clone(), config).spawn();

        task.stop();
        let outcome = tokio::time::timeout(Duration::from_secs(5), task.outcome())
            .await
            .expect("stop should interrupt the interval sleep")
            .unwrap();
        assert_eq!(outcome, WatchOutcome::Cancelled);
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let lookup = ScriptedLookup::new(&[Step::Status("declined")]);
        let mut watch = watch_over(lookup.clone(), fast(20));
        let handle = watch.stop_handle();

        let tick = watch.next().await.unwrap();
        assert_eq!(tick.state, SettlementState::Failed);
        assert_eq!(watch.outcome(), Some(WatchOutcome::Settled(SettlementState::Failed)));

        // Stopping after natural termination changes nothing.
        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
        assert!(watch.next().await.is_none());
        assert_eq!(watch.outcome(), Some(WatchOutcome::Settled(SettlementState::Failed)));
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_error_counts_as_unknown_attempt() {
        let lookup = ScriptedLookup::new(&[
            Step::Status("pending"),
            Step::Offline,
            Step::Status("pending"),
        ]);
        let mut watch = watch_over(lookup.clone(), fast(3));

        let mut states = Vec::new();
        while let Some(tick) = watch.next().await {
            states.push(tick.state);
        }
        assert_eq!(
            states,
            [
                SettlementState::Pending,
                SettlementState::Unknown,
                SettlementState::Pending,
            ]
        );
        assert_eq!(watch.outcome(), Some(WatchOutcome::TimedOut { attempts: 3 }));
        assert_eq!(lookup.calls(), 3);
    }

    #[tokio::test]
    async fn test_errors_alone_still_hit_ceiling() {
        let lookup = ScriptedLookup::new(&[Step::Offline]);
        let outcome = watch_over(lookup.clone(), fast(4)).run().await;
        assert_eq!(outcome, WatchOutcome::TimedOut { attempts: 4 });
        assert_eq!(lookup.calls(), 4);
    }

    /// Blocks inside the lookup until released.
    struct GatedLookup {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PaymentLookup for GatedLookup {
        async fn get_by_payment_reference(
            &self,
            _reference: &PaymentReference,
        ) -> Result<Option<StatusRecord>> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Some(StatusRecord::new(RecordOrigin::Payment, "captured")))
        }

        async fn get_by_order_reference(
            &self,
            _reference: &OrderReference,
        ) -> Result<Option<StatusRecord>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_in_flight_result_discarded_after_stop() {
        let lookup = Arc::new(GatedLookup {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let fired = Arc::new(AtomicUsize::new(0));
        let ticked = fired.clone();
        let finished = fired.clone();
        let task = PaymentStatusResolver::new(lookup.clone())
            .watch(Some("pay_1"), None, fast(20))
            .unwrap()
            .on_tick(move |_, _| {
                ticked.fetch_add(1, Ordering::SeqCst);
            })
            .on_terminal(move |_| {
                finished.fetch_add(1, Ordering::SeqCst);
            })
            .spawn();

        lookup.entered.notified().await;
        task.stop();
        lookup.release.notify_one();

        assert_eq!(task.outcome().await.unwrap(), WatchOutcome::Cancelled);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
