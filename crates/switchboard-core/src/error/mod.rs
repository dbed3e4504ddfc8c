//! Error types for the Switchboard client layer
//!
//! Every failure that leaves a provider adapter is expressed in one shared
//! taxonomy. Retry decisions look only at [`ErrorKind`], never at
//! provider-specific detail.

mod constructors;
mod sanitize;
mod types;

#[cfg(test)]
mod tests;

pub use sanitize::sanitize_provider_error_text;
pub use types::{ClientError, ClientResult, ErrorKind};
