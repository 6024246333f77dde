//! Expose an [`effect_rpc::BuiltRouter`] over HTTP with [Axum](https://docs.rs/axum/latest/axum/).
//!
//! The wire format follows the tRPC HTTP batch link so existing JS clients can talk to it.
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::panic_in_result_fn,
    // missing_docs
)]
#![forbid(unsafe_code)]
#![allow(clippy::module_inception)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod endpoint;
pub mod jsonrpc;

pub use endpoint::Endpoint;
