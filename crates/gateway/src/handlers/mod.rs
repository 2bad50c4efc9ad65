//! API handlers module

pub mod auth;
pub mod health;
pub mod papers;
