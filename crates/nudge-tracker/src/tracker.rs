use crate::fence::{WatchedReminder, active_geofences};
use crate::source::{
    PositionError, PositionErrorKind, PositionOptions, PositionSample, PositionSource,
    PositionUpdate, PositionWatch,
};
use crate::status::TrackingStatus;
use metrics::{counter, gauge};
use nudge_core::{LocationTriggerType, Reminder, ReminderId};
use nudge_geo::DEFAULT_RADIUS_M;
use nudge_observability::{
    ACTIVE_GEOFENCES, GEOFENCE_TRANSITIONS_TOTAL, POSITION_ERRORS_TOTAL, POSITION_FIXES_TOTAL,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::watch;

pub type TransitionCallback = Box<dyn FnMut(&Reminder) + Send>;

/// Requests a tracker stop from inside a transition callback or another task.
///
/// The tracker honors the request after the running callback returns, before
/// it evaluates the next update, or at once if it is parked in
/// [`GeofenceTracker::process_next`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    requested: Arc<watch::Sender<bool>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self {
            requested: Arc::new(watch::Sender::new(false)),
        }
    }
}

impl StopHandle {
    pub fn stop(&self) {
        self.requested.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.requested.borrow()
    }

    /// Resolves once a stop has been requested.
    async fn requested(&self) {
        let mut requested = self.requested.subscribe();
        // The sender lives in `self`, so the wait cannot fail.
        let _ = requested.wait_for(|requested| *requested).await;
    }

    fn reset(&self) {
        self.requested.send_replace(false);
    }
}

/// Whether a containment change fires for the given trigger type.
pub fn is_transition(trigger: LocationTriggerType, was_inside: bool, is_inside: bool) -> bool {
    match trigger {
        LocationTriggerType::Arrive => !was_inside && is_inside,
        LocationTriggerType::Leave => was_inside && !is_inside,
    }
}

/// Turns position updates plus a reminder snapshot into arrive/leave events.
///
/// The first fix seen for a geofence only records a baseline; events fire
/// on later changes. State for a geofence survives rebinds while the
/// reminder stays in the active set, and is dropped on [`stop`](Self::stop).
pub struct GeofenceTracker<S: PositionSource> {
    source: S,
    options: PositionOptions,
    default_radius_m: f64,
    active: Vec<WatchedReminder>,
    containment: HashMap<ReminderId, bool>,
    subscription: Option<PositionWatch>,
    on_transition: Option<TransitionCallback>,
    status: watch::Sender<TrackingStatus>,
    stop_handle: StopHandle,
    unsupported: bool,
}

impl<S: PositionSource> GeofenceTracker<S> {
    pub fn new(source: S) -> Self {
        let (status, _) = watch::channel(TrackingStatus::default());
        Self {
            source,
            options: PositionOptions::watch(),
            default_radius_m: DEFAULT_RADIUS_M,
            active: Vec::new(),
            containment: HashMap::new(),
            subscription: None,
            on_transition: None,
            status,
            stop_handle: StopHandle::default(),
            unsupported: false,
        }
    }

    pub fn with_options(mut self, options: PositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_default_radius(mut self, radius_m: f64) -> Self {
        if radius_m.is_finite() && radius_m > 0.0 {
            self.default_radius_m = radius_m;
        }
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Begins tracking or rebinds to a new reminder snapshot.
    ///
    /// Containment for reminders that left the set is pruned; the rest is
    /// kept. The position watch opens when the active set becomes non-empty
    /// and closes when it empties.
    pub fn start<F>(&mut self, reminders: &[Reminder], on_transition: F)
    where
        F: FnMut(&Reminder) + Send + 'static,
    {
        if self.unsupported {
            tracing::debug!("position sensing unsupported, start ignored");
            return;
        }
        self.stop_handle.reset();
        self.on_transition = Some(Box::new(on_transition));
        self.active = active_geofences(reminders, self.default_radius_m);

        let active = &self.active;
        let before = self.containment.len();
        self.containment
            .retain(|id, _| active.iter().any(|watched| &watched.geofence.id == id));
        let pruned = before - self.containment.len();
        gauge!(ACTIVE_GEOFENCES).set(self.active.len() as f64);
        tracing::debug!(
            geofences = self.active.len(),
            pruned,
            "geofence set rebound"
        );

        if self.active.is_empty() {
            self.unsubscribe();
            self.status.send_modify(TrackingStatus::mark_idle);
            return;
        }
        if self.subscription.is_none() {
            self.subscribe();
        }
    }

    /// Cancels the watch and forgets all containment. Idempotent.
    pub fn stop(&mut self) {
        self.stop_handle.reset();
        let was_subscribed = self.unsubscribe();
        let had_state = !self.containment.is_empty() || !self.active.is_empty();
        self.containment.clear();
        self.active.clear();
        self.on_transition = None;
        if !was_subscribed && !had_state && !self.status.borrow().is_active {
            return;
        }
        gauge!(ACTIVE_GEOFENCES).set(0.0);
        self.status.send_modify(TrackingStatus::mark_idle);
        tracing::info!("geofence tracking stopped");
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Re-queries the source after an `Unsupported` failure. Returns whether
    /// `start` will act again.
    pub fn recheck_capability(&mut self) -> bool {
        if self.source.is_supported() {
            self.unsupported = false;
        }
        !self.unsupported
    }

    pub fn status(&self) -> TrackingStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TrackingStatus> {
        self.status.subscribe()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn watched(&self) -> &[WatchedReminder] {
        &self.active
    }

    /// Last recorded containment for a geofence, `None` before its baseline.
    pub fn containment(&self, id: &ReminderId) -> Option<bool> {
        self.containment.get(id).copied()
    }

    /// Evaluates one update and returns how many transitions fired.
    /// Updates reaching an idle tracker are dropped.
    pub fn handle_update(&mut self, update: PositionUpdate) -> usize {
        if self.stop_handle.is_requested() {
            self.stop();
            return 0;
        }
        if self.subscription.is_none() {
            tracing::trace!("update ignored while idle");
            return 0;
        }
        match update {
            Ok(sample) => self.evaluate(sample),
            Err(err) => {
                self.record_error(&err);
                0
            }
        }
    }

    /// Drains every update already queued on the watch, in arrival order.
    /// Returns the number of updates processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        loop {
            let Some(subscription) = self.subscription.as_mut() else {
                break;
            };
            match subscription.updates.try_recv() {
                Ok(update) => {
                    self.handle_update(update);
                    processed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.source_closed();
                    break;
                }
            }
        }
        processed
    }

    /// Waits for the next update and evaluates it. Returns `false` once there
    /// is no live watch to wait on.
    ///
    /// A stop requested through a [`StopHandle`] while waiting tears the
    /// tracker down without waiting for another update.
    pub async fn process_next(&mut self) -> bool {
        let stop_handle = self.stop_handle.clone();
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        let next = tokio::select! {
            update = subscription.updates.recv() => Some(update),
            _ = stop_handle.requested() => None,
        };
        match next {
            Some(Some(update)) => {
                self.handle_update(update);
                self.subscription.is_some()
            }
            Some(None) => {
                self.source_closed();
                false
            }
            None => {
                self.stop();
                false
            }
        }
    }

    fn evaluate(&mut self, sample: PositionSample) -> usize {
        counter!(POSITION_FIXES_TOTAL).increment(1);
        self.status.send_modify(|status| status.record_fix(&sample));

        let observations: Vec<bool> = self
            .active
            .iter()
            .map(|watched| watched.geofence.contains(sample.coordinate))
            .collect();

        let mut fired = 0;
        for (index, is_inside) in observations.into_iter().enumerate() {
            let watched = &self.active[index];
            let geofence = &watched.geofence;
            let Some(was_inside) = self.containment.insert(geofence.id.clone(), is_inside) else {
                tracing::trace!(reminder_id = %geofence.id, is_inside, "containment baseline");
                continue;
            };
            if !is_transition(geofence.trigger_type, was_inside, is_inside) {
                continue;
            }

            fired += 1;
            let trigger = geofence.trigger_type.as_str();
            counter!(GEOFENCE_TRANSITIONS_TOTAL, "trigger" => trigger).increment(1);
            tracing::info!(
                reminder_id = %geofence.id,
                trigger,
                accuracy_m = sample.accuracy_m,
                "geofence transition"
            );
            if let Some(callback) = self.on_transition.as_mut() {
                callback(&watched.reminder);
            }
            if self.stop_handle.is_requested() {
                self.stop();
                break;
            }
        }
        fired
    }

    fn subscribe(&mut self) {
        if !self.source.is_supported() {
            self.mark_unsupported(&PositionError::unsupported());
            return;
        }
        match self.source.watch_position(&self.options) {
            Ok(subscription) => {
                tracing::info!(
                    watch = %subscription.id,
                    geofences = self.active.len(),
                    high_accuracy = self.options.high_accuracy,
                    "position watch started"
                );
                self.subscription = Some(subscription);
                self.status.send_modify(TrackingStatus::mark_subscribed);
            }
            Err(err) if err.kind == PositionErrorKind::Unsupported => self.mark_unsupported(&err),
            Err(err) => self.record_error(&err),
        }
    }

    fn unsubscribe(&mut self) -> bool {
        let Some(subscription) = self.subscription.take() else {
            return false;
        };
        self.source.clear_watch(subscription.id);
        tracing::info!(watch = %subscription.id, "position watch cleared");
        true
    }

    fn source_closed(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.source.clear_watch(subscription.id);
        }
        self.record_error(&PositionError::unavailable("position source closed the watch"));
    }

    fn mark_unsupported(&mut self, err: &PositionError) {
        self.unsupported = true;
        self.record_error(err);
    }

    fn record_error(&mut self, err: &PositionError) {
        counter!(POSITION_ERRORS_TOTAL, "kind" => err.kind.as_str()).increment(1);
        tracing::warn!(error = %err, kind = %err.kind, "position error");
        self.status.send_modify(|status| status.record_error(err));
    }
}

impl<S: PositionSource> Drop for GeofenceTracker<S> {
    fn drop(&mut self) {
        // Release the host watch even if the owner never called stop().
        self.unsubscribe();
    }
}
