//! Errand — terminal AI assistant with a dynamically loaded tool registry.
//!
//! The model backend sees a set of machine-generated tool specifications;
//! the dispatcher bridges its untyped call requests back onto the typed
//! toolkit methods that produced them.

pub mod agent;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod schema;
pub mod tools;
pub mod types;
