//! Command Tests
//!
//! End-to-end behavior of the exstrings command set through the facade:
//! - conditional: SETIE/SETNE/DELIE/DELNE against real and scripted hosts
//! - publish: publish-after-write ordering and no-op silence
//! - scan: NGET/NDEL walks, vanishing keys, completeness across batch sizes
//! - config: executors built from `exstrings.toml`

#[path = "../common/mod.rs"]
mod common;

mod conditional;
mod config;
mod publish;
mod scan;
