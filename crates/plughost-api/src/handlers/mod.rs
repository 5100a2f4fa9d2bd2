//! HTTP request handlers.

pub mod admin;
pub mod content;
pub mod extensions;
pub mod health;
pub mod system;
