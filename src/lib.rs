//! Candidate Assessment - Multi-stage candidate evaluation engine
//!
//! This crate drives a candidate through resume matching, optional spoken
//! communication analysis and a timed technical quiz, and combines the stage
//! scores into a single weighted result. The analysis itself is performed by
//! an external service reached through the `AnalysisGateway` port.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
