pub mod domain;
pub mod ids;
pub mod time;

pub use domain::{
    ChecklistItem, LocationTriggerType, Reminder, ReminderGroup, ReminderLocation,
    ReminderPriority, ReminderTrigger,
};
pub use ids::{ChecklistItemId, GroupId, ReminderId};
pub use time::{EpochMillis, age_ms, now_epoch_millis};
