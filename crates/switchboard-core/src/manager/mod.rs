//! Provider registry and lifecycle
//!
//! [`ClientManager`] owns one [`ClientInstance`](crate::providers::ClientInstance)
//! per configured provider. It is an ordinary value: construct as many as
//! needed, there is no process-wide instance.

mod lifecycle;
mod types;


pub use types::ClientManager;
