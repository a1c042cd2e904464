//! Start and end notifications

use crate::config::Notification;
use crate::runner::CommandRunner;

/// Substitute `{stack}` in the message, then `{message}` in the command
pub fn render(notification: &Notification, stack: &str) -> String {
    let message = notification.message.replace("{stack}", stack);
    notification.command.replace("{message}", &message)
}

/// Run each notification command locally, in order
///
/// A notification that fails is reported and skipped. Returns the number of
/// notifications that ran successfully.
pub fn run_all(runner: &dyn CommandRunner, notifications: &[Notification], stack: &str) -> usize {
    let mut delivered = 0;
    for notification in notifications {
        let command = render(notification, stack);
        match runner.run_local(&command) {
            Ok(output) if output.success() => delivered += 1,
            Ok(output) => log::warn!(
                "notification '{command}' failed: {}",
                output.failure_summary()
            ),
            Err(e) => log::warn!("notification '{command}' failed: {e:#}"),
        }
    }
    delivered
}
