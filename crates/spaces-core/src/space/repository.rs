//! SpaceRepository trait definition.
//!
//! Provides create/read/update operations for spaces and append/read
//! operations for their turns. Turns are append-only: there is no update or
//! delete path for them, and spaces are never hard-deleted.

use spaces_types::error::RepositoryError;
use spaces_types::space::{Space, Turn};
use uuid::Uuid;

/// Ordering applied to space listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpaceOrder {
    /// Newest created first.
    #[default]
    CreatedDesc,
    /// Most recently active first.
    UpdatedDesc,
}

/// Filter for listing an owner's spaces.
#[derive(Debug, Clone, Default)]
pub struct SpaceFilter {
    /// Only favorited spaces.
    pub saved_only: bool,
    pub order: SpaceOrder,
    pub limit: Option<i64>,
}

/// Repository trait for space and turn persistence.
///
/// Implementations live in spaces-infra (e.g., `SqliteSpaceRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Every call is independently atomic.
pub trait SpaceRepository: Send + Sync {
    /// Insert a new space.
    fn create_space(
        &self,
        space: &Space,
    ) -> impl std::future::Future<Output = Result<Space, RepositoryError>> + Send;

    /// Get a space by its unique ID.
    fn get_space(
        &self,
        space_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Space>, RepositoryError>> + Send;

    /// Update a space's mutable fields (title, saved, updated_at).
    fn update_space(
        &self,
        space: &Space,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List an owner's spaces.
    fn list_spaces(
        &self,
        owner_id: &str,
        filter: &SpaceFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Space>, RepositoryError>> + Send;

    /// Append a turn and advance the parent space's `updated_at`.
    ///
    /// Returns `NotFound` if the parent space does not exist.
    fn append_turn(
        &self,
        turn: &Turn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get all turns for a space, ordered by created_at ASC.
    fn list_turns(
        &self,
        space_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Get the most recent turn of a space.
    fn last_turn(
        &self,
        space_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Turn>, RepositoryError>> + Send;

    /// Get the number of turns in a space.
    fn count_turns(
        &self,
        space_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;
}
