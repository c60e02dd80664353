//! Space and turn persistence for Spaces.
//!
//! `SpaceRepository` is the port the infrastructure layer implements;
//! `TranscriptStore` layers validation and ownership checks on top of it.

pub mod repository;
pub mod service;
