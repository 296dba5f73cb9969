//! Board tree domain model.
//!
//! # Responsibility
//! - Define the board → list → task tree persisted by the board store.
//! - Provide small in-place helpers used by the mutation engine.
//!
//! # Invariants
//! - `owner_id` and `created_at` never change after construction.
//! - `BoardList::last_modified` never moves backwards (see `BoardList::touch`).
//! - Task order is insertion order; list order is creation order.

use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable board identifier.
pub type BoardId = Uuid;
/// Stable list identifier, unique across all boards.
pub type ListId = Uuid;
/// Stable task identifier, unique across all lists.
pub type TaskId = Uuid;

/// Single work item inside a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Task {
    /// Creates an open task with a generated stable ID.
    pub fn new(title: impl Into<String>, description: Option<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description,
            completed: false,
            created_at,
        }
    }

    /// Overrides the fields present in `patch`, leaving the rest untouched.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Sparse set of task fields for `update_task`.
///
/// `description` is doubly optional: `None` keeps the current value,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// Returns whether the patch overrides nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Named column of tasks within one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardList {
    pub id: ListId,
    pub title: String,
    pub tasks: Vec<Task>,
    pub is_favorite: bool,
    pub is_archived: bool,
    /// Unix epoch milliseconds of the last mutation to this list or its tasks.
    pub last_modified: i64,
}

impl BoardList {
    /// Creates an empty, non-favorite, non-archived list.
    pub fn new(title: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            tasks: Vec::new(),
            is_favorite: false,
            is_archived: false,
            last_modified: now_ms,
        }
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub(crate) fn task_position(&self, task_id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == task_id)
    }

    /// Refreshes `last_modified`, never moving it backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.last_modified = self.last_modified.max(now_ms);
    }
}

/// Top-level container owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub owner_id: UserId,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub lists: Vec<BoardList>,
}

impl Board {
    /// Creates an empty board with a generated stable ID.
    pub fn new(title: impl Into<String>, owner_id: UserId, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            owner_id,
            created_at,
            lists: Vec::new(),
        }
    }

    pub fn list(&self, list_id: ListId) -> Option<&BoardList> {
        self.lists.iter().find(|list| list.id == list_id)
    }

    pub(crate) fn list_mut(&mut self, list_id: ListId) -> Option<&mut BoardList> {
        self.lists.iter_mut().find(|list| list.id == list_id)
    }

    /// Returns whether `user_id` owns this board.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Counts tasks across every list of this board.
    pub fn task_count(&self) -> usize {
        self.lists.iter().map(|list| list.tasks.len()).sum()
    }
}

/// List projection for the recent view, tagged with its owning board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentList {
    pub board_id: BoardId,
    pub board_title: String,
    #[serde(flatten)]
    pub list: BoardList,
}
