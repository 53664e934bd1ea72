//! Monitor360 operator CLI

pub mod cli;
pub mod error;
