//! Outbound email for ARC-14: the SendGrid mailer, the reminder scan and the
//! scheduler that runs it in the background.

mod mailer;
mod reminders;
mod scheduler;

pub use mailer::{
    Delivery, EmailMessage, Notifier, SendGridMailer, reminder_message, test_message,
};
pub use reminders::{ReminderResult, ScanReport, SingleReminder, run_reminder_scan, send_task_reminder};
pub use scheduler::{ReminderScheduler, ReminderSettings};
