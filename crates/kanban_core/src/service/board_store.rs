//! Board store: canonical owner of the board tree.
//!
//! # Responsibility
//! - Route every mutation through the pure engine, then persist, then notify.
//! - Expose derived views and owner gating over the current tree.
//!
//! # Invariants
//! - The persisted record always equals the in-memory tree after a successful
//!   mutation returns.
//! - Unresolved ids are silent no-ops: nothing is persisted, nobody is notified.
//! - Subscribers observe the tree only after it was persisted.

use crate::clock::{Clock, SystemClock};
use crate::config::KanbanConfig;
use crate::model::board::{Board, BoardId, BoardList, ListId, RecentList, TaskId, TaskPatch};
use crate::model::user::UserId;
use crate::repo::kv_store::{load_json_record, save_json_record, KeyValueStore, StorageError};
use crate::service::board_engine::{apply_command, BoardCommand, CommandOutcome};
use crate::service::board_views::{archived_lists, favorite_lists, recent_lists, ViewScope};
use crate::service::subscribers::{SubscriptionId, Subscribers};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Board store failures. Unknown ids are not errors.
#[derive(Debug)]
pub enum StoreError {
    /// Loading or persisting the board record failed.
    Storage(StorageError),
    /// Internal consistency mismatch between a write and its read-back.
    InconsistentState(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent board state: {details}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Rejection from owner gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    BoardNotFound(BoardId),
    NotOwner { board_id: BoardId, user_id: UserId },
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BoardNotFound(board_id) => write!(f, "board not found: {board_id}"),
            Self::NotOwner { board_id, user_id } => {
                write!(f, "user {user_id} does not own board {board_id}")
            }
        }
    }
}

impl Error for AccessError {}

/// Board tree store over a key-value medium.
pub struct BoardStore<S: KeyValueStore, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    boards_key: String,
    recent_limit: usize,
    boards: Vec<Board>,
    subscribers: Subscribers<[Board]>,
}

impl<S: KeyValueStore> BoardStore<S, SystemClock> {
    /// Loads the board record using the wall clock for timestamps.
    pub fn open(storage: S, config: &KanbanConfig) -> StoreResult<Self> {
        Self::open_with_clock(storage, SystemClock::new(), config)
    }
}

impl<S: KeyValueStore, C: Clock> BoardStore<S, C> {
    /// Loads the board record; an absent or malformed record yields no boards.
    pub fn open_with_clock(storage: S, clock: C, config: &KanbanConfig) -> StoreResult<Self> {
        let boards: Vec<Board> = load_json_record(&storage, &config.boards_key)?;
        info!(
            "event=board_store_open module=board_store status=ok boards={}",
            boards.len()
        );
        Ok(Self {
            storage,
            clock,
            boards_key: config.boards_key.clone(),
            recent_limit: config.recent_limit,
            boards,
            subscribers: Subscribers::default(),
        })
    }

    /// Current snapshot of every board, in creation order.
    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn board(&self, board_id: BoardId) -> Option<&Board> {
        self.boards.iter().find(|board| board.id == board_id)
    }

    /// Boards owned by `user_id`, in creation order.
    pub fn boards_for_owner(&self, user_id: UserId) -> Vec<&Board> {
        self.boards
            .iter()
            .filter(|board| board.is_owned_by(user_id))
            .collect()
    }

    /// Resolves a board for `user_id`, rejecting non-owners.
    pub fn authorize(&self, board_id: BoardId, user_id: UserId) -> Result<&Board, AccessError> {
        let board = self
            .board(board_id)
            .ok_or(AccessError::BoardNotFound(board_id))?;
        if !board.is_owned_by(user_id) {
            return Err(AccessError::NotOwner { board_id, user_id });
        }
        Ok(board)
    }

    /// Registers a listener called with the full tree after every persisted change.
    pub fn subscribe(&mut self, listener: impl Fn(&[Board]) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Applies one command, then persists and notifies when the tree changed.
    ///
    /// # Errors
    /// - `Storage` when persisting fails. The in-memory tree keeps the change,
    ///   so the next successful write carries it.
    pub fn execute(&mut self, command: BoardCommand) -> StoreResult<CommandOutcome> {
        let name = command.name();
        let board_id = command.board_id();
        let outcome = apply_command(&mut self.boards, command, self.clock.now_ms());

        if !outcome.is_applied() {
            debug!(
                "event=board_command module=board_store status=skip command={name} board_id={} reason=unresolved_id",
                display_id(board_id)
            );
            return Ok(outcome);
        }

        if let Err(err) = save_json_record(&self.storage, &self.boards_key, &self.boards) {
            error!(
                "event=board_command module=board_store status=error command={name} board_id={} error_code=persist_failed error={err}",
                display_id(board_id)
            );
            return Err(err.into());
        }
        debug!(
            "event=board_command module=board_store status=ok command={name} board_id={} boards={}",
            display_id(board_id),
            self.boards.len()
        );

        self.subscribers.notify(&self.boards);
        Ok(outcome)
    }

    /// Appends a new empty board owned by `owner_id`.
    pub fn create_board(&mut self, title: impl Into<String>, owner_id: UserId) -> StoreResult<Board> {
        let outcome = self.execute(BoardCommand::CreateBoard {
            title: title.into(),
            owner_id,
        })?;
        outcome
            .created_id()
            .and_then(|board_id| self.board(board_id))
            .cloned()
            .ok_or(StoreError::InconsistentState(
                "created board missing after write",
            ))
    }

    pub fn update_board(&mut self, board_id: BoardId, title: impl Into<String>) -> StoreResult<()> {
        self.execute(BoardCommand::UpdateBoard {
            board_id,
            title: title.into(),
        })
        .map(drop)
    }

    /// Removes a board with all of its lists and tasks.
    pub fn delete_board(&mut self, board_id: BoardId) -> StoreResult<()> {
        self.execute(BoardCommand::DeleteBoard { board_id }).map(drop)
    }

    /// Appends a list to a board. Returns the new list id, or `None` for an
    /// unknown board.
    pub fn add_list(
        &mut self,
        board_id: BoardId,
        title: impl Into<String>,
    ) -> StoreResult<Option<ListId>> {
        self.execute(BoardCommand::AddList {
            board_id,
            title: title.into(),
        })
        .map(CommandOutcome::created_id)
    }

    pub fn update_list(
        &mut self,
        board_id: BoardId,
        list_id: ListId,
        title: impl Into<String>,
    ) -> StoreResult<()> {
        self.execute(BoardCommand::UpdateList {
            board_id,
            list_id,
            title: title.into(),
        })
        .map(drop)
    }

    pub fn delete_list(&mut self, board_id: BoardId, list_id: ListId) -> StoreResult<()> {
        self.execute(BoardCommand::DeleteList { board_id, list_id })
            .map(drop)
    }

    pub fn toggle_list_favorite(&mut self, board_id: BoardId, list_id: ListId) -> StoreResult<()> {
        self.execute(BoardCommand::ToggleListFavorite { board_id, list_id })
            .map(drop)
    }

    pub fn toggle_list_archive(&mut self, board_id: BoardId, list_id: ListId) -> StoreResult<()> {
        self.execute(BoardCommand::ToggleListArchive { board_id, list_id })
            .map(drop)
    }

    /// Appends an open task to a list. Returns the new task id, or `None` when
    /// the board or list is unknown.
    pub fn add_task(
        &mut self,
        board_id: BoardId,
        list_id: ListId,
        title: impl Into<String>,
        description: Option<String>,
    ) -> StoreResult<Option<TaskId>> {
        self.execute(BoardCommand::AddTask {
            board_id,
            list_id,
            title: title.into(),
            description,
        })
        .map(CommandOutcome::created_id)
    }

    pub fn update_task(
        &mut self,
        board_id: BoardId,
        list_id: ListId,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> StoreResult<()> {
        self.execute(BoardCommand::UpdateTask {
            board_id,
            list_id,
            task_id,
            patch,
        })
        .map(drop)
    }

    pub fn delete_task(
        &mut self,
        board_id: BoardId,
        list_id: ListId,
        task_id: TaskId,
    ) -> StoreResult<()> {
        self.execute(BoardCommand::DeleteTask {
            board_id,
            list_id,
            task_id,
        })
        .map(drop)
    }

    /// Moves a task to the tail of `dest_list_id` within the same board.
    pub fn move_task(
        &mut self,
        board_id: BoardId,
        source_list_id: ListId,
        dest_list_id: ListId,
        task_id: TaskId,
    ) -> StoreResult<()> {
        self.execute(BoardCommand::MoveTask {
            board_id,
            source_list_id,
            dest_list_id,
            task_id,
        })
        .map(drop)
    }

    /// Recent non-archived lists across all boards, capped by the configured limit.
    pub fn recent_lists(&self) -> Vec<RecentList> {
        self.recent_lists_in(ViewScope::AllBoards, self.recent_limit)
    }

    pub fn recent_lists_in(&self, scope: ViewScope, limit: usize) -> Vec<RecentList> {
        recent_lists(&self.boards, scope, limit)
    }

    pub fn favorite_lists(&self) -> Vec<BoardList> {
        self.favorite_lists_in(ViewScope::AllBoards)
    }

    pub fn favorite_lists_in(&self, scope: ViewScope) -> Vec<BoardList> {
        favorite_lists(&self.boards, scope)
    }

    pub fn archived_lists(&self) -> Vec<BoardList> {
        self.archived_lists_in(ViewScope::AllBoards)
    }

    pub fn archived_lists_in(&self, scope: ViewScope) -> Vec<BoardList> {
        archived_lists(&self.boards, scope)
    }
}

fn display_id(board_id: Option<BoardId>) -> String {
    board_id.map_or_else(|| "new".to_string(), |id| id.to_string())
}
