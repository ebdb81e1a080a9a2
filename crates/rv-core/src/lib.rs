//! rusty-reviews/crates/rv-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Reviews.

pub mod accounts;
pub mod error;
pub mod interaction;
pub mod models;
pub mod pagination;
pub mod posts;
pub mod session;
pub mod traits;

// Re-exporting for easier access in other crates
pub use accounts::AccountService;
pub use error::*;
pub use interaction::InteractionService;
pub use models::*;
pub use pagination::{FeedPaginator, FeedScope, PageRequest};
pub use posts::{CreatedPost, PostService};
pub use session::SessionStore;
pub use traits::*;
