pub mod notifiers;
pub mod traits;

use std::sync::Arc;

use crate::config::{NotificationsConfig, Transport};
use notifiers::{DiscordNotifier, IftttNotifier};

pub use traits::{Notifier, NotificationEvent, NotifierError};

/// Builds the configured transport around the resolved webhook secret.
pub fn build_notifier(config: &NotificationsConfig, webhook: String) -> Arc<dyn Notifier> {
    match config.transport {
        Transport::Ifttt => Arc::new(IftttNotifier::new(webhook)),
        Transport::Discord => Arc::new(DiscordNotifier::new(webhook, Some(config.discord_username.clone()))),
    }
}
