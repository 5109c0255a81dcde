//! Core types and trait definitions for the Arsenal weapons encyclopedia.
//!
//! This crate has no HTTP or database dependencies.
//! Storage backends implement [`store::ArsenalStore`]; the API layer depends
//! only on that trait.

// Native `async fn` in traits; the store trait spells out `Send` futures
// explicitly where it matters.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod graph;
pub mod lookup;
pub mod maintenance;
pub mod manufacturer;
pub mod resolve;
pub mod stats;
pub mod store;
pub mod user;
pub mod weapon;

pub use error::{Error, Result};
