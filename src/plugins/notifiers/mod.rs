// Notifier plugin implementations
pub mod discord;
pub mod email;
pub mod group;
pub mod log;

pub use discord::DiscordNotifier;
pub use email::EmailNotifier;
pub use group::NotifierGroup;
pub use log::LogNotifier;
