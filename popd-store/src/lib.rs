pub mod backends;
pub mod config;
pub mod error;
pub mod r#trait;
pub mod types;

pub use backends::{FileMailStore, MemoryMailStore};
pub use config::{MemoryUser, StoreConfig};
pub use error::{Result, StoreError};
pub use r#trait::{MailStore, Store, UserStore};
pub use types::{MessageEntry, MessageId, MessageReader};
