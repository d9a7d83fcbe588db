//! Route handlers

pub mod auth;
pub mod books;
pub mod system;
