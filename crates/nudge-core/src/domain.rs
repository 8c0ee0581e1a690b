use crate::ids::{ChecklistItemId, GroupId, ReminderId};
use crate::time::{EpochMillis, now_epoch_millis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPriority {
    Urgent,
    Week,
    #[default]
    Routine,
}

/// What wakes a reminder up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderTrigger {
    Time,
    Location,
    Both,
}

impl ReminderTrigger {
    pub fn includes_location(self) -> bool {
        matches!(self, Self::Location | Self::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationTriggerType {
    Arrive,
    Leave,
}

impl LocationTriggerType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arrive => "arrive",
            Self::Leave => "leave",
        }
    }
}

/// A saved place attached to a reminder.
///
/// Coordinates stay optional because a location can be named before it is
/// pinned on the map; such a location never becomes a geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderLocation {
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius_m: Option<f64>,
    pub trigger_type: LocationTriggerType,
}

impl ReminderLocation {
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        trigger_type: LocationTriggerType,
    ) -> Self {
        Self {
            name: name.into(),
            latitude: Some(latitude),
            longitude: Some(longitude),
            radius_m: None,
            trigger_type,
        }
    }

    pub fn unpinned(name: impl Into<String>, trigger_type: LocationTriggerType) -> Self {
        Self {
            name: name.into(),
            latitude: None,
            longitude: None,
            radius_m: None,
            trigger_type,
        }
    }

    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.radius_m = Some(radius_m);
        self
    }

    pub fn is_pinned(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub priority: ReminderPriority,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    pub trigger: ReminderTrigger,
    /// Local wall-clock time, `HH:MM`.
    #[serde(default)]
    pub time: Option<String>,
    /// Weekdays, 0 = Sunday.
    #[serde(default)]
    pub days: Vec<u8>,
    #[serde(default)]
    pub location: Option<ReminderLocation>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub completion_count: u32,
    #[serde(default)]
    pub total_shown: u32,
    #[serde(default)]
    pub last_completed_ms: Option<EpochMillis>,
    #[serde(default)]
    pub created_at_ms: EpochMillis,
}

impl Reminder {
    pub fn new(title: impl Into<String>, trigger: ReminderTrigger) -> Self {
        Self {
            id: ReminderId::new(),
            title: title.into(),
            description: None,
            icon: String::new(),
            priority: ReminderPriority::default(),
            group_id: None,
            trigger,
            time: None,
            days: Vec::new(),
            location: None,
            checklist: Vec::new(),
            completion_count: 0,
            total_shown: 0,
            last_completed_ms: None,
            created_at_ms: now_epoch_millis(),
        }
    }

    pub fn with_id(mut self, id: impl Into<ReminderId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_location(mut self, location: ReminderLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// The location this reminder watches, if its trigger mode uses one.
    pub fn watched_location(&self) -> Option<&ReminderLocation> {
        if !self.trigger.includes_location() {
            return None;
        }
        self.location.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderGroup {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_preset: bool,
    #[serde(default)]
    pub reminder_ids: Vec<ReminderId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_only_reminders_watch_no_location() {
        let reminder = Reminder::new("Take vitamins", ReminderTrigger::Time).with_location(
            ReminderLocation::new("Home", 37.5665, 126.9780, LocationTriggerType::Arrive),
        );
        assert!(reminder.watched_location().is_none());
    }

    #[test]
    fn both_trigger_watches_its_location() {
        let reminder = Reminder::new("Buy milk", ReminderTrigger::Both).with_location(
            ReminderLocation::new("Market", 37.5651, 126.9895, LocationTriggerType::Arrive),
        );
        assert_eq!(
            reminder.watched_location().map(|location| location.name.as_str()),
            Some("Market")
        );
    }

    #[test]
    fn deserializes_sparse_reminder_json() {
        let raw = r#"{
            "id": "r-7",
            "title": "Lock the door",
            "trigger": "location",
            "location": { "name": "Home", "latitude": 37.5, "trigger_type": "leave" }
        }"#;
        let reminder: Reminder = serde_json::from_str(raw).unwrap();
        assert_eq!(reminder.id.as_str(), "r-7");
        assert_eq!(reminder.priority, ReminderPriority::Routine);
        let location = reminder.location.unwrap();
        assert_eq!(location.trigger_type, LocationTriggerType::Leave);
        assert!(!location.is_pinned());
        assert!(location.radius_m.is_none());
    }

    #[test]
    fn group_fields_default_when_absent() {
        let group: ReminderGroup =
            serde_json::from_str(r#"{ "id": "morning", "name": "Morning" }"#).unwrap();
        assert_eq!(group.id.as_str(), "morning");
        assert!(group.icon.is_empty());
        assert!(!group.is_preset);
        assert!(group.reminder_ids.is_empty());
    }
}
