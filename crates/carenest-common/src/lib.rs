pub mod cache;
pub mod category;
pub mod errors;
pub mod id;
pub mod identity;
pub mod notifications;

pub use cache::{MemoryQueryCache, QueryCache, QueryKey};
pub use category::RecordCategory;
pub use errors::{CareError, ConfigError};
pub use id::{new_id, EntityId};
pub use identity::Identity;
pub use notifications::{Notification, NotificationLevel, NotificationQueue};

pub type Result<T> = std::result::Result<T, CareError>;
