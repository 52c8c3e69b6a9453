//! Domain models for warden.

pub mod user;
