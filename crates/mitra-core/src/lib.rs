//! Core types and trait definitions for the Mitra wellness backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! and text generation are reached through the [`store::DocumentStore`] and
//! [`generate::Generator`] traits; every feature's prompt construction and
//! rule-based fallback lives here so it can be exercised without a network.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod conversation;
pub mod emotion;
pub mod error;
pub mod generate;
pub mod health;
pub mod journal;
pub mod memory;
pub mod mood;
pub mod orchestrator;
pub mod parse;
pub mod persona;
pub mod practice;
pub mod soundscape;
pub mod store;
pub mod twin;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
