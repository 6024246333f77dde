//! effect-rpc: typesafe RPC procedures whose resolvers are structured effects.
//!
//! Procedures are registered on a [`Router`] and run their logic as an
//! [`Effect`](effect::Effect) on a shared [`ManagedRuntime`]. The runtime reduces
//! every outcome, including panics, to either a value or a transport [`Error`],
//! which is the only error shape adapters such as `effect-rpc-axum` ever send.
//!
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

pub mod effect;

mod config;
mod error;
mod procedure;
mod router;
mod runtime;

pub use config::Config;
pub use error::{BuildError, DeclaredError, Error, ErrorCode, ExecError};
pub use procedure::{Procedure, ProcedureKind};
pub use router::{BuiltRouter, Router};
pub use runtime::ManagedRuntime;
