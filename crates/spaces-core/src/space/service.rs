//! Transcript store: validated, owner-scoped access to spaces and turns.
//!
//! `TranscriptStore` wraps a `SpaceRepository` and enforces the invariants the
//! components above it rely on: titles are derived from the originating
//! prompt and renamed only to non-empty strings of at most 50 characters,
//! turns carry non-empty bounded content, and a space that is missing or
//! owned by someone else is indistinguishable (`NotFound`).

use chrono::Utc;
use spaces_types::error::SpaceError;
use spaces_types::space::{
    CallerContext, MAX_TITLE_CHARS, MAX_TURN_CHARS, Space, SpaceSummary, SpaceWithTurns, Turn,
    TurnRole,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::repository::{SpaceFilter, SpaceOrder, SpaceRepository};

/// Default number of spaces returned by [`TranscriptStore::recent`].
pub const DEFAULT_RECENT_LIMIT: i64 = 5;

/// Owner-scoped space and turn persistence.
///
/// Generic over `SpaceRepository` to maintain clean architecture
/// (spaces-core never depends on spaces-infra).
pub struct TranscriptStore<R: SpaceRepository> {
    repo: R,
}

impl<R: SpaceRepository> TranscriptStore<R> {
    /// Create a new store over the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Access the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    // --- Space lifecycle ---

    /// Create a space from its originating prompt.
    ///
    /// The title is the first 100 characters of the prompt. The prompt itself
    /// is not appended as a turn here; the orchestrator does that as the
    /// first submission.
    pub async fn create_conversation(
        &self,
        ctx: &CallerContext,
        prompt: &str,
    ) -> Result<Space, SpaceError> {
        validate_content(prompt)?;

        let space = Space::from_prompt(&ctx.owner_id, prompt);
        let space = self.repo.create_space(&space).await?;
        info!(space_id = %space.id, owner = %ctx.owner_id, "Space created");
        Ok(space)
    }

    /// Get a space owned by the caller.
    pub async fn get(&self, ctx: &CallerContext, space_id: &Uuid) -> Result<Space, SpaceError> {
        match self.repo.get_space(space_id).await? {
            Some(space) if space.owner_id == ctx.owner_id => Ok(space),
            Some(_) => {
                debug!(space_id = %space_id, "Space exists but is owned by another identity");
                Err(SpaceError::NotFound)
            }
            None => Err(SpaceError::NotFound),
        }
    }

    /// Get a space together with its ordered transcript.
    pub async fn get_with_turns(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
    ) -> Result<SpaceWithTurns, SpaceError> {
        let space = self.get(ctx, space_id).await?;
        let turns = self.repo.list_turns(space_id).await?;
        Ok(SpaceWithTurns { space, turns })
    }

    /// Rename a space. The new title must be non-empty and at most 50 characters.
    pub async fn rename(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
        new_title: &str,
    ) -> Result<Space, SpaceError> {
        let title = new_title.trim();
        if title.is_empty() {
            return Err(SpaceError::Validation("title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(SpaceError::Validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let mut space = self.get(ctx, space_id).await?;
        space.title = title.to_string();
        space.updated_at = Utc::now();
        self.repo.update_space(&space).await?;
        info!(space_id = %space_id, "Space renamed");
        Ok(space)
    }

    /// Set or clear the favorite flag.
    pub async fn set_favorite(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
        saved: bool,
    ) -> Result<Space, SpaceError> {
        let mut space = self.get(ctx, space_id).await?;
        space.saved = saved;
        space.updated_at = Utc::now();
        self.repo.update_space(&space).await?;
        info!(space_id = %space_id, saved, "Space favorite flag updated");
        Ok(space)
    }

    // --- Turns ---

    /// Append a turn to a space owned by the caller.
    pub async fn append_turn(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
        role: TurnRole,
        content: &str,
    ) -> Result<Turn, SpaceError> {
        validate_content(content)?;
        self.get(ctx, space_id).await?;

        let turn = Turn::new(*space_id, role, content);
        self.repo.append_turn(&turn).await?;
        debug!(space_id = %space_id, turn_id = %turn.id, role = %role, "Turn appended");
        Ok(turn)
    }

    /// List the turns of a space, ascending by creation time.
    pub async fn list_turns(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
    ) -> Result<Vec<Turn>, SpaceError> {
        self.get(ctx, space_id).await?;
        Ok(self.repo.list_turns(space_id).await?)
    }

    /// Append a greeting from the assistant if the space has no turns yet.
    ///
    /// Returns the greeting turn, or `None` if the space already had turns.
    pub async fn greet_if_empty(
        &self,
        ctx: &CallerContext,
        space_id: &Uuid,
        greeting: &str,
    ) -> Result<Option<Turn>, SpaceError> {
        self.get(ctx, space_id).await?;
        if self.repo.count_turns(space_id).await? > 0 {
            return Ok(None);
        }
        let turn = self
            .append_turn(ctx, space_id, TurnRole::Assistant, greeting)
            .await?;
        Ok(Some(turn))
    }

    // --- Listings ---

    /// The caller's newest spaces by creation time.
    pub async fn recent(
        &self,
        ctx: &CallerContext,
        limit: Option<i64>,
    ) -> Result<Vec<Space>, SpaceError> {
        let filter = SpaceFilter {
            saved_only: false,
            order: SpaceOrder::CreatedDesc,
            limit: Some(limit.unwrap_or(DEFAULT_RECENT_LIMIT)),
        };
        Ok(self.repo.list_spaces(&ctx.owner_id, &filter).await?)
    }

    /// The caller's favorited spaces, most recently active first.
    pub async fn favorites(&self, ctx: &CallerContext) -> Result<Vec<SpaceSummary>, SpaceError> {
        let filter = SpaceFilter {
            saved_only: true,
            order: SpaceOrder::UpdatedDesc,
            limit: None,
        };
        self.summaries(ctx, &filter).await
    }

    /// All of the caller's spaces, most recently active first.
    pub async fn all(
        &self,
        ctx: &CallerContext,
        limit: Option<i64>,
    ) -> Result<Vec<SpaceSummary>, SpaceError> {
        let filter = SpaceFilter {
            saved_only: false,
            order: SpaceOrder::UpdatedDesc,
            limit,
        };
        self.summaries(ctx, &filter).await
    }

    async fn summaries(
        &self,
        ctx: &CallerContext,
        filter: &SpaceFilter,
    ) -> Result<Vec<SpaceSummary>, SpaceError> {
        let spaces = self.repo.list_spaces(&ctx.owner_id, filter).await?;
        let mut summaries = Vec::with_capacity(spaces.len());
        for space in spaces {
            let last_turn = self.repo.last_turn(&space.id).await?;
            summaries.push(SpaceSummary { space, last_turn });
        }
        Ok(summaries)
    }
}

/// Reject empty (or whitespace-only) and oversized turn content.
pub fn validate_content(content: &str) -> Result<(), SpaceError> {
    if content.trim().is_empty() {
        return Err(SpaceError::Validation("content must not be empty".to_string()));
    }
    if content.chars().count() > MAX_TURN_CHARS {
        return Err(SpaceError::Validation(format!(
            "content must be at most {MAX_TURN_CHARS} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemorySpaceRepository;

    fn alice() -> CallerContext {
        CallerContext::new("alice")
    }

    fn store() -> TranscriptStore<MemorySpaceRepository> {
        TranscriptStore::new(MemorySpaceRepository::new())
    }

    #[tokio::test]
    async fn create_conversation_derives_title() {
        let store = store();
        let prompt = "x".repeat(140);
        let space = store.create_conversation(&alice(), &prompt).await.unwrap();
        assert_eq!(space.title.chars().count(), 100);
        assert_eq!(space.initial_prompt, prompt);
        assert_eq!(space.owner_id, "alice");
    }

    #[tokio::test]
    async fn create_conversation_rejects_blank_prompt() {
        let store = store();
        let err = store.create_conversation(&alice(), "   ").await.unwrap_err();
        assert!(matches!(err, SpaceError::Validation(_)));
        assert_eq!(store.repo().space_count(), 0);
    }

    #[tokio::test]
    async fn rename_to_empty_is_rejected_and_title_unchanged() {
        let store = store();
        let space = store.create_conversation(&alice(), "Hello").await.unwrap();

        let err = store.rename(&alice(), &space.id, "").await.unwrap_err();
        assert!(matches!(err, SpaceError::Validation(_)));

        let reloaded = store.get(&alice(), &space.id).await.unwrap();
        assert_eq!(reloaded.title, "Hello");
    }

    #[tokio::test]
    async fn rename_enforces_fifty_character_limit() {
        let store = store();
        let space = store.create_conversation(&alice(), "Hello").await.unwrap();

        let too_long = "t".repeat(51);
        assert!(matches!(
            store.rename(&alice(), &space.id, &too_long).await,
            Err(SpaceError::Validation(_))
        ));

        let exact = "t".repeat(50);
        let renamed = store.rename(&alice(), &space.id, &exact).await.unwrap();
        assert_eq!(renamed.title, exact);
        assert!(renamed.updated_at >= space.updated_at);
    }

    #[tokio::test]
    async fn other_owner_sees_not_found() {
        let store = store();
        let space = store.create_conversation(&alice(), "Hello").await.unwrap();
        let bob = CallerContext::new("bob");

        assert!(matches!(store.get(&bob, &space.id).await, Err(SpaceError::NotFound)));
        assert!(matches!(
            store.append_turn(&bob, &space.id, TurnRole::User, "hi").await,
            Err(SpaceError::NotFound)
        ));
        assert!(matches!(
            store.set_favorite(&bob, &space.id, true).await,
            Err(SpaceError::NotFound)
        ));
        assert_eq!(store.repo().turn_count(&space.id), 0);
    }

    #[tokio::test]
    async fn unknown_space_is_not_found() {
        let store = store();
        let err = store
            .append_turn(&alice(), &Uuid::now_v7(), TurnRole::User, "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::NotFound));
    }

    #[tokio::test]
    async fn turns_are_listed_in_creation_order() {
        let store = store();
        let space = store.create_conversation(&alice(), "Hello").await.unwrap();
        for (role, text) in [
            (TurnRole::User, "one"),
            (TurnRole::Assistant, "two"),
            (TurnRole::User, "three"),
        ] {
            store.append_turn(&alice(), &space.id, role, text).await.unwrap();
        }

        let turns = store.list_turns(&alice(), &space.id).await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn append_rejects_oversized_content() {
        let store = store();
        let space = store.create_conversation(&alice(), "Hello").await.unwrap();
        let huge = "a".repeat(MAX_TURN_CHARS + 1);
        assert!(matches!(
            store.append_turn(&alice(), &space.id, TurnRole::User, &huge).await,
            Err(SpaceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn greet_if_empty_only_greets_once() {
        let store = store();
        let space = store.create_conversation(&alice(), "Hello").await.unwrap();

        let first = store.greet_if_empty(&alice(), &space.id, "Welcome!").await.unwrap();
        assert_eq!(first.unwrap().role, TurnRole::Assistant);

        let second = store.greet_if_empty(&alice(), &space.id, "Welcome!").await.unwrap();
        assert!(second.is_none());
        assert_eq!(store.repo().turn_count(&space.id), 1);
    }

    #[tokio::test]
    async fn favorites_lists_saved_spaces_with_preview() {
        let store = store();
        let a = store.create_conversation(&alice(), "first").await.unwrap();
        let b = store.create_conversation(&alice(), "second").await.unwrap();
        store.append_turn(&alice(), &b.id, TurnRole::User, "latest").await.unwrap();
        store.set_favorite(&alice(), &b.id, true).await.unwrap();

        let favorites = store.favorites(&alice()).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].space.id, b.id);
        assert_eq!(favorites[0].last_turn.as_ref().unwrap().content, "latest");

        let all = store.all(&alice(), None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|s| s.space.id == a.id && s.last_turn.is_none()));
    }

    #[tokio::test]
    async fn recent_defaults_to_five() {
        let store = store();
        for i in 0..7 {
            store
                .create_conversation(&alice(), &format!("prompt {i}"))
                .await
                .unwrap();
        }
        store
            .create_conversation(&CallerContext::new("bob"), "not yours")
            .await
            .unwrap();

        let recent = store.recent(&alice(), None).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert!(recent.iter().all(|s| s.owner_id == "alice"));
        assert_eq!(recent[0].initial_prompt, "prompt 6");
    }
}
