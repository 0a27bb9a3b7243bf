//! Mothr Core
//!
//! Core types shared by the Mothr client crates.
//!
//! This crate contains:
//! - Domain types: jobs, job parameters and the service catalogue
//! - DTOs: payloads exchanged with the remote job service

pub mod domain;
pub mod dto;
