//! Upstream completion abstractions.
//!
//! - `CompletionClient`: RPITIT trait for concrete provider adapters
//! - `BoxCompletionClient`: object-safe wrapper for dynamic dispatch

pub mod box_client;
pub mod client;

pub use self::box_client::BoxCompletionClient;
pub use self::client::{CompletionClient, FragmentStream};
