//! role-signup: role-conditional multi-step registration workflow.

pub mod config;
pub mod error;
pub mod registration;
pub mod store;
