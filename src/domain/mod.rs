pub mod message;
pub mod receipt;
pub mod user;

pub use message::AudioMessage;
pub use receipt::Receipt;
pub use user::{User, UserRole};
