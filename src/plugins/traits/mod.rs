pub mod notifier;

pub use notifier::{Notifier, NotificationEvent, NotifierError};

#[cfg(test)]
pub use notifier::MockNotifier;
