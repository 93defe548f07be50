//! Core types, trait definitions, and the review workflow for Accolade.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::RecordStore`] and
//! [`store::AccountDirectory`]; the transport layer drives
//! [`workflow::ReviewWorkflow`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod error;
pub mod etag;
pub mod memory;
pub mod record;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
