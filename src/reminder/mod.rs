//! Reminder table and tick manager.

mod table;
mod tick;

pub use table::{InMemoryReminderTable, Reminder, ReminderError, ReminderTable};
pub use tick::{ReminderSink, ReminderTickManager};
