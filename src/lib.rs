//! Mailguard — rule-based email threat scanner and folder triage daemon.

pub mod config;
pub mod error;
pub mod message;
pub mod notify;
pub mod scanner;
pub mod service;
pub mod tools;
pub mod transport;
pub mod triage;
