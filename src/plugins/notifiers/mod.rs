// Notifier implementations
pub mod discord;
pub mod ifttt;

pub use discord::DiscordNotifier;
pub use ifttt::IftttNotifier;
