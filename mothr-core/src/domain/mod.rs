//! Core domain types
//!
//! These types describe jobs as the remote service reports them and the
//! parameters a caller attaches to a job request.

pub mod job;
pub mod parameter;
pub mod service;
