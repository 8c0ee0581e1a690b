use nudge_core::{LocationTriggerType, Reminder, ReminderId};
use nudge_geo::{Coordinate, FenceCenter, GeoFence, is_within_radius};
use std::collections::HashSet;

/// A reminder's location reduced to what containment checks need.
#[derive(Debug, Clone, PartialEq)]
pub struct Geofence {
    pub id: ReminderId,
    pub fence: GeoFence,
    pub trigger_type: LocationTriggerType,
}

impl Geofence {
    /// Materializes the geofence a reminder watches. Returns `None` for
    /// time-only reminders and for locations missing either coordinate.
    pub fn from_reminder(reminder: &Reminder, default_radius_m: f64) -> Option<Self> {
        let location = reminder.watched_location()?;
        let center = FenceCenter::from_parts(location.latitude, location.longitude);
        if !matches!(center, FenceCenter::Configured(_)) {
            return None;
        }
        Some(Self {
            id: reminder.id.clone(),
            fence: GeoFence::circle_with_default(center, location.radius_m, default_radius_m),
            trigger_type: location.trigger_type,
        })
    }

    pub fn contains(&self, position: Coordinate) -> bool {
        is_within_radius(position, &self.fence)
    }
}

#[derive(Debug, Clone)]
pub struct WatchedReminder {
    pub geofence: Geofence,
    pub reminder: Reminder,
}

/// Builds the active set from a reminder snapshot, keeping input order.
/// A repeated reminder id keeps its first occurrence.
pub fn active_geofences(reminders: &[Reminder], default_radius_m: f64) -> Vec<WatchedReminder> {
    let mut seen = HashSet::new();
    let mut active = Vec::new();
    for reminder in reminders {
        let Some(geofence) = Geofence::from_reminder(reminder, default_radius_m) else {
            continue;
        };
        if !seen.insert(geofence.id.clone()) {
            tracing::warn!(reminder_id = %geofence.id, "duplicate reminder id ignored");
            continue;
        }
        active.push(WatchedReminder {
            geofence,
            reminder: reminder.clone(),
        });
    }
    active
}

#[cfg(test)]
mod tests {
    use super::*;
    use nudge_core::{ReminderLocation, ReminderTrigger};

    fn located(id: &str, trigger: ReminderTrigger, location: ReminderLocation) -> Reminder {
        Reminder::new(id, trigger).with_id(id).with_location(location)
    }

    #[test]
    fn only_pinned_location_reminders_are_active() {
        let reminders = vec![
            located(
                "time-only",
                ReminderTrigger::Time,
                ReminderLocation::new("Home", 37.5, 127.0, LocationTriggerType::Arrive),
            ),
            located(
                "unpinned",
                ReminderTrigger::Location,
                ReminderLocation::unpinned("Gym", LocationTriggerType::Arrive),
            ),
            located(
                "both",
                ReminderTrigger::Both,
                ReminderLocation::new("Office", 37.5, 127.0, LocationTriggerType::Leave),
            ),
            Reminder::new("no-location", ReminderTrigger::Location).with_id("no-location"),
        ];

        let active = active_geofences(&reminders, 100.0);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].geofence.id.as_str(), "both");
        assert_eq!(active[0].geofence.trigger_type, LocationTriggerType::Leave);
    }

    #[test]
    fn default_radius_applies_at_materialization() {
        let reminders = vec![
            located(
                "a",
                ReminderTrigger::Location,
                ReminderLocation::new("A", 37.5, 127.0, LocationTriggerType::Arrive),
            ),
            located(
                "b",
                ReminderTrigger::Location,
                ReminderLocation::new("B", 37.5, 127.0, LocationTriggerType::Arrive)
                    .with_radius(400.0),
            ),
        ];
        let active = active_geofences(&reminders, 150.0);
        assert_eq!(active[0].geofence.fence.radius_m, 150.0);
        assert_eq!(active[1].geofence.fence.radius_m, 400.0);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let location = ReminderLocation::new("A", 37.5, 127.0, LocationTriggerType::Arrive);
        let reminders = vec![
            located("dup", ReminderTrigger::Location, location.clone()),
            located(
                "dup",
                ReminderTrigger::Location,
                ReminderLocation {
                    trigger_type: LocationTriggerType::Leave,
                    ..location
                },
            ),
        ];
        let active = active_geofences(&reminders, 100.0);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].geofence.trigger_type, LocationTriggerType::Arrive);
    }
}
