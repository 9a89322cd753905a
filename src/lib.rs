#![forbid(unsafe_code)]

//! Drive a single task through an ACP agent process over stdio JSON-RPC.

pub mod acp;
pub mod client;
pub mod config;
pub mod errors;

pub use acp::stream::{Completion, TaskOutput};
pub use client::{AcpClient, TaskRequest};
pub use config::ClientConfig;
pub use errors::{AppError, Result};
