pub mod manager;
pub mod notifiers;
pub mod retailers;
pub mod traits;

pub use manager::PluginManager;
pub use traits::{NotifierPlugin, RetailerPlugin};
