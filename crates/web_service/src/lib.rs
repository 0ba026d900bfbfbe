//! HTTP surface of the SQL chat service.
//!
//! Handlers live in [`controllers`], stateful stores in [`services`], and the
//! shared [`server::AppState`] ties them to the budgeter, the relay and the
//! database connectors.

pub mod controllers;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod server;
pub mod services;
pub mod storage;

pub use error::AppError;
pub use server::{app_config, build_state, run, AppState};
