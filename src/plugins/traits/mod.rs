pub mod notifier;
pub mod retailer;

pub use notifier::{AlertKind, DeliveryFailure, NotificationReport, NotifierPlugin, StockAlert};
pub use retailer::{RetailerPlugin, SearchRow};

#[cfg(test)]
pub use notifier::MockNotifierPlugin;
