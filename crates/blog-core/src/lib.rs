//! # Blog Core
//!
//! The domain layer of the blog service.
//! Entities, query values and the ports the infrastructure implements.
//! This crate has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod query;

pub use error::DomainError;
