//! Warden Core: domain models, error taxonomy and the collaborator
//! traits (record store, notification port) shared by every crate.

pub mod error;
pub mod models;
pub mod notify;
pub mod repository;
