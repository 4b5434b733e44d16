pub mod manager;
pub mod types;

pub use manager::SessionManager;
pub use types::{Role, Session, SessionKey, Turn};
