//! Data Transfer Objects
//!
//! Payloads sent to and received from the remote job service.

pub mod auth;
pub mod job;
