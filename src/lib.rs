//! pitwall library
//!
//! Resilient fetching and TTL caching of Formula 1 data from the OpenF1 API.
//! The binary is a thin consumer of the modules exposed here.

pub mod cache;
pub mod cli;
pub mod config;
pub mod delay;
pub mod fetch;
pub mod openf1;
pub mod report;
