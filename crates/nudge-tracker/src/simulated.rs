use crate::source::{
    PositionError, PositionOptions, PositionSample, PositionSource, PositionUpdate, PositionWatch,
    WatchId,
};
use async_trait::async_trait;
use nudge_core::{age_ms, now_epoch_millis};
use nudge_geo::Coordinate;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// Deterministic in-process position source.
///
/// Clones share state, so a test or replay driver keeps one handle while the
/// tracker owns another.
///
/// Watches never time out on their own: `watch_position` records the
/// options it was given but emits nothing until a driver pushes. Stalled
/// fixes are modelled by pushing a [`PositionError::timeout`].
#[derive(Debug, Clone)]
pub struct SimulatedPositionSource {
    inner: Arc<Mutex<SimulatedState>>,
}

#[derive(Debug)]
struct SimulatedState {
    supported: bool,
    next_watch: u64,
    watches: BTreeMap<WatchId, mpsc::UnboundedSender<PositionUpdate>>,
    watch_failure: Option<PositionError>,
    last_fix: Option<PositionSample>,
    opened_with: Vec<PositionOptions>,
}

impl Default for SimulatedPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPositionSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimulatedState {
                supported: true,
                next_watch: 1,
                watches: BTreeMap::new(),
                watch_failure: None,
                last_fix: None,
                opened_with: Vec::new(),
            })),
        }
    }

    pub fn unsupported() -> Self {
        let source = Self::new();
        source.set_supported(false);
        source
    }

    pub fn set_supported(&self, supported: bool) {
        self.state().supported = supported;
    }

    /// Makes the next `watch_position` call fail with `error`.
    pub fn fail_next_watch(&self, error: PositionError) {
        self.state().watch_failure = Some(error);
    }

    /// Delivers a fix stamped with the current time. Returns how many watches
    /// received it.
    pub fn push_fix(&self, coordinate: Coordinate, accuracy_m: f64) -> usize {
        self.push_sample(PositionSample::new(coordinate, accuracy_m, now_epoch_millis()))
    }

    pub fn push_sample(&self, sample: PositionSample) -> usize {
        let mut state = self.state();
        state.last_fix = Some(sample);
        broadcast(&mut state, Ok(sample))
    }

    pub fn push_error(&self, error: PositionError) -> usize {
        let mut state = self.state();
        broadcast(&mut state, Err(error))
    }

    /// Drops every live watch sender, closing the subscribers' channels.
    pub fn close(&self) {
        self.state().watches.clear();
    }

    pub fn active_watches(&self) -> usize {
        self.state().watches.len()
    }

    /// Options passed to every `watch_position` call so far, oldest first.
    pub fn watch_requests(&self) -> Vec<PositionOptions> {
        self.state().opened_with.clone()
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_watch(&self) -> (WatchId, mpsc::UnboundedReceiver<PositionUpdate>) {
        let mut state = self.state();
        let id = WatchId(state.next_watch);
        state.next_watch += 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        state.watches.insert(id, sender);
        (id, receiver)
    }
}

fn broadcast(state: &mut SimulatedState, update: PositionUpdate) -> usize {
    state
        .watches
        .retain(|_, sender| sender.send(update.clone()).is_ok());
    state.watches.len()
}

#[async_trait]
impl PositionSource for SimulatedPositionSource {
    fn is_supported(&self) -> bool {
        self.state().supported
    }

    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, PositionError> {
        {
            let mut state = self.state();
            if !state.supported {
                return Err(PositionError::unsupported());
            }
            state.opened_with.push(*options);
            if let Some(error) = state.watch_failure.take() {
                return Err(error);
            }
        }
        let (id, updates) = self.open_watch();
        tracing::debug!(watch = %id, "simulated watch opened");
        Ok(PositionWatch { id, updates })
    }

    fn clear_watch(&self, id: WatchId) {
        if self.state().watches.remove(&id).is_some() {
            tracing::debug!(watch = %id, "simulated watch cleared");
        }
    }

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<PositionSample, PositionError> {
        {
            let state = self.state();
            if !state.supported {
                return Err(PositionError::unsupported());
            }
            if let Some(fix) = state.last_fix {
                let max_age = options.maximum_age.as_millis() as u64;
                if max_age > 0 && age_ms(fix.timestamp_ms, now_epoch_millis()) <= max_age {
                    return Ok(fix);
                }
            }
        }

        let (id, mut updates) = self.open_watch();
        let outcome = tokio::time::timeout(options.timeout, updates.recv()).await;
        self.clear_watch(id);
        match outcome {
            Ok(Some(update)) => update,
            Ok(None) => Err(PositionError::unavailable("position source closed")),
            Err(_) => Err(PositionError::timeout(options.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PositionErrorKind;
    use std::time::Duration;

    const HOME: Coordinate = Coordinate::new(37.5665, 126.9780);

    #[test]
    fn fixes_reach_every_live_watch() {
        let source = SimulatedPositionSource::new();
        let mut first = source.watch_position(&PositionOptions::watch()).unwrap();
        let mut second = source.watch_position(&PositionOptions::watch()).unwrap();
        assert_ne!(first.id, second.id);

        assert_eq!(source.push_fix(HOME, 5.0), 2);
        assert_eq!(first.updates.try_recv().unwrap().unwrap().coordinate, HOME);
        assert_eq!(second.updates.try_recv().unwrap().unwrap().accuracy_m, 5.0);
    }

    #[test]
    fn cleared_watch_receives_nothing() {
        let source = SimulatedPositionSource::new();
        let mut watch = source.watch_position(&PositionOptions::watch()).unwrap();
        source.clear_watch(watch.id);
        assert_eq!(source.push_fix(HOME, 5.0), 0);
        assert!(watch.updates.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_is_forgotten() {
        let source = SimulatedPositionSource::new();
        let watch = source.watch_position(&PositionOptions::watch()).unwrap();
        drop(watch);
        assert_eq!(source.push_error(PositionError::permission_denied()), 0);
        assert_eq!(source.active_watches(), 0);
    }

    #[test]
    fn watch_failure_is_one_shot() {
        let source = SimulatedPositionSource::new();
        source.fail_next_watch(PositionError::permission_denied());
        let err = source.watch_position(&PositionOptions::watch()).unwrap_err();
        assert_eq!(err.kind, PositionErrorKind::PermissionDenied);
        assert!(source.watch_position(&PositionOptions::watch()).is_ok());
        assert_eq!(source.watch_requests().len(), 2);
    }

    #[test]
    fn unsupported_source_refuses_watches() {
        let source = SimulatedPositionSource::unsupported();
        assert!(!source.is_supported());
        let err = source.watch_position(&PositionOptions::watch()).unwrap_err();
        assert_eq!(err.kind, PositionErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn one_shot_waits_for_next_fix() {
        let source = SimulatedPositionSource::new();
        let pusher = source.clone();
        let task = tokio::spawn(async move {
            while pusher.active_watches() == 0 {
                tokio::task::yield_now().await;
            }
            pusher.push_fix(HOME, 3.0);
        });
        let fix = source.current_position(&PositionOptions::one_shot()).await.unwrap();
        task.await.unwrap();
        assert_eq!(fix.coordinate, HOME);
        assert_eq!(source.active_watches(), 0);
    }

    #[tokio::test]
    async fn one_shot_times_out() {
        let source = SimulatedPositionSource::new();
        let options = PositionOptions {
            timeout: Duration::from_millis(20),
            ..PositionOptions::one_shot()
        };
        let err = source.current_position(&options).await.unwrap_err();
        assert_eq!(err.kind, PositionErrorKind::Timeout);
    }

    #[tokio::test]
    async fn one_shot_reuses_recent_fix_only_when_allowed() {
        let source = SimulatedPositionSource::new();
        source.push_fix(HOME, 8.0);

        let cached = PositionOptions {
            maximum_age: Duration::from_secs(60),
            ..PositionOptions::one_shot()
        };
        assert_eq!(source.current_position(&cached).await.unwrap().accuracy_m, 8.0);

        let fresh = PositionOptions {
            timeout: Duration::from_millis(20),
            ..PositionOptions::one_shot()
        };
        assert!(source.current_position(&fresh).await.is_err());
    }

    #[tokio::test]
    async fn stalled_watch_reports_only_pushed_timeouts() {
        let source = SimulatedPositionSource::new();
        let options = PositionOptions {
            timeout: Duration::from_millis(5),
            ..PositionOptions::watch()
        };
        let mut watch = source.watch_position(&options).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(watch.updates.try_recv().is_err());

        source.push_error(PositionError::timeout(options.timeout));
        let err = watch.updates.try_recv().unwrap().unwrap_err();
        assert_eq!(err.kind, PositionErrorKind::Timeout);
    }
}
