//! Pure board-tree mutation engine.
//!
//! # Responsibility
//! - Apply one `BoardCommand` to an in-memory board tree.
//! - Own all `last_modified` bookkeeping for lists.
//!
//! # Invariants
//! - Never touches storage or subscribers; the caller persists and notifies.
//! - An unresolved board/list/task id leaves the tree untouched and yields
//!   `CommandOutcome::Unresolved`.
//! - A moved task keeps its id and fields and lands at the destination tail.

use crate::model::board::{Board, BoardId, BoardList, ListId, Task, TaskId, TaskPatch};
use crate::model::user::UserId;
use uuid::Uuid;

/// One mutation of the board tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    CreateBoard {
        title: String,
        owner_id: UserId,
    },
    UpdateBoard {
        board_id: BoardId,
        title: String,
    },
    DeleteBoard {
        board_id: BoardId,
    },
    AddList {
        board_id: BoardId,
        title: String,
    },
    UpdateList {
        board_id: BoardId,
        list_id: ListId,
        title: String,
    },
    DeleteList {
        board_id: BoardId,
        list_id: ListId,
    },
    ToggleListFavorite {
        board_id: BoardId,
        list_id: ListId,
    },
    ToggleListArchive {
        board_id: BoardId,
        list_id: ListId,
    },
    AddTask {
        board_id: BoardId,
        list_id: ListId,
        title: String,
        description: Option<String>,
    },
    UpdateTask {
        board_id: BoardId,
        list_id: ListId,
        task_id: TaskId,
        patch: TaskPatch,
    },
    DeleteTask {
        board_id: BoardId,
        list_id: ListId,
        task_id: TaskId,
    },
    MoveTask {
        board_id: BoardId,
        source_list_id: ListId,
        dest_list_id: ListId,
        task_id: TaskId,
    },
}

impl BoardCommand {
    /// Stable command name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateBoard { .. } => "create_board",
            Self::UpdateBoard { .. } => "update_board",
            Self::DeleteBoard { .. } => "delete_board",
            Self::AddList { .. } => "add_list",
            Self::UpdateList { .. } => "update_list",
            Self::DeleteList { .. } => "delete_list",
            Self::ToggleListFavorite { .. } => "toggle_list_favorite",
            Self::ToggleListArchive { .. } => "toggle_list_archive",
            Self::AddTask { .. } => "add_task",
            Self::UpdateTask { .. } => "update_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::MoveTask { .. } => "move_task",
        }
    }

    /// Board the command addresses, if it addresses an existing one.
    pub fn board_id(&self) -> Option<BoardId> {
        match self {
            Self::CreateBoard { .. } => None,
            Self::UpdateBoard { board_id, .. }
            | Self::DeleteBoard { board_id }
            | Self::AddList { board_id, .. }
            | Self::UpdateList { board_id, .. }
            | Self::DeleteList { board_id, .. }
            | Self::ToggleListFavorite { board_id, .. }
            | Self::ToggleListArchive { board_id, .. }
            | Self::AddTask { board_id, .. }
            | Self::UpdateTask { board_id, .. }
            | Self::DeleteTask { board_id, .. }
            | Self::MoveTask { board_id, .. } => Some(*board_id),
        }
    }
}

/// Result of applying one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The tree changed; the new entity has this id.
    Created(Uuid),
    /// The tree changed.
    Applied,
    /// Some addressed id did not resolve; the tree is unchanged.
    Unresolved,
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// Id of the entity a create-style command produced.
    pub fn created_id(self) -> Option<Uuid> {
        match self {
            Self::Created(id) => Some(id),
            _ => None,
        }
    }
}

/// Applies `command` to `boards` using `now_ms` as the timestamp `T`.
pub fn apply_command(
    boards: &mut Vec<Board>,
    command: BoardCommand,
    now_ms: i64,
) -> CommandOutcome {
    match command {
        BoardCommand::CreateBoard { title, owner_id } => {
            let board = Board::new(title, owner_id, now_ms);
            let board_id = board.id;
            boards.push(board);
            CommandOutcome::Created(board_id)
        }
        BoardCommand::UpdateBoard { board_id, title } => {
            with_board(boards, board_id, |board| {
                board.title = title;
                CommandOutcome::Applied
            })
        }
        BoardCommand::DeleteBoard { board_id } => {
            let before = boards.len();
            boards.retain(|board| board.id != board_id);
            if boards.len() == before {
                CommandOutcome::Unresolved
            } else {
                CommandOutcome::Applied
            }
        }
        BoardCommand::AddList { board_id, title } => with_board(boards, board_id, |board| {
            let list = BoardList::new(title, now_ms);
            let list_id = list.id;
            board.lists.push(list);
            CommandOutcome::Created(list_id)
        }),
        BoardCommand::UpdateList {
            board_id,
            list_id,
            title,
        } => with_list(boards, board_id, list_id, |list| {
            list.title = title;
            list.touch(now_ms);
            CommandOutcome::Applied
        }),
        BoardCommand::DeleteList { board_id, list_id } => {
            with_board(boards, board_id, |board| {
                let before = board.lists.len();
                board.lists.retain(|list| list.id != list_id);
                if board.lists.len() == before {
                    CommandOutcome::Unresolved
                } else {
                    CommandOutcome::Applied
                }
            })
        }
        BoardCommand::ToggleListFavorite { board_id, list_id } => {
            with_list(boards, board_id, list_id, |list| {
                list.is_favorite = !list.is_favorite;
                list.touch(now_ms);
                CommandOutcome::Applied
            })
        }
        BoardCommand::ToggleListArchive { board_id, list_id } => {
            with_list(boards, board_id, list_id, |list| {
                list.is_archived = !list.is_archived;
                list.touch(now_ms);
                CommandOutcome::Applied
            })
        }
        BoardCommand::AddTask {
            board_id,
            list_id,
            title,
            description,
        } => with_list(boards, board_id, list_id, |list| {
            let task = Task::new(title, description, now_ms);
            let task_id = task.id;
            list.tasks.push(task);
            list.touch(now_ms);
            CommandOutcome::Created(task_id)
        }),
        BoardCommand::UpdateTask {
            board_id,
            list_id,
            task_id,
            patch,
        } => with_list(boards, board_id, list_id, |list| {
            let Some(task) = list.tasks.iter_mut().find(|task| task.id == task_id) else {
                return CommandOutcome::Unresolved;
            };
            task.apply_patch(&patch);
            list.touch(now_ms);
            CommandOutcome::Applied
        }),
        BoardCommand::DeleteTask {
            board_id,
            list_id,
            task_id,
        } => with_list(boards, board_id, list_id, |list| {
            let Some(position) = list.task_position(task_id) else {
                return CommandOutcome::Unresolved;
            };
            list.tasks.remove(position);
            list.touch(now_ms);
            CommandOutcome::Applied
        }),
        BoardCommand::MoveTask {
            board_id,
            source_list_id,
            dest_list_id,
            task_id,
        } => with_board(boards, board_id, |board| {
            move_task(board, source_list_id, dest_list_id, task_id, now_ms)
        }),
    }
}

fn move_task(
    board: &mut Board,
    source_list_id: ListId,
    dest_list_id: ListId,
    task_id: TaskId,
    now_ms: i64,
) -> CommandOutcome {
    // Resolve everything before detaching so a failed move never drops a task.
    let Some(dest_index) = board.lists.iter().position(|list| list.id == dest_list_id) else {
        return CommandOutcome::Unresolved;
    };
    let Some(source_index) = board.lists.iter().position(|list| list.id == source_list_id) else {
        return CommandOutcome::Unresolved;
    };
    let Some(position) = board.lists[source_index].task_position(task_id) else {
        return CommandOutcome::Unresolved;
    };

    let source = &mut board.lists[source_index];
    let task = source.tasks.remove(position);
    source.touch(now_ms);

    let dest = &mut board.lists[dest_index];
    dest.tasks.push(task);
    dest.touch(now_ms);
    CommandOutcome::Applied
}

fn with_board(
    boards: &mut [Board],
    board_id: BoardId,
    apply: impl FnOnce(&mut Board) -> CommandOutcome,
) -> CommandOutcome {
    match boards.iter_mut().find(|board| board.id == board_id) {
        Some(board) => apply(board),
        None => CommandOutcome::Unresolved,
    }
}

fn with_list(
    boards: &mut [Board],
    board_id: BoardId,
    list_id: ListId,
    apply: impl FnOnce(&mut BoardList) -> CommandOutcome,
) -> CommandOutcome {
    with_board(boards, board_id, |board| match board.list_mut(list_id) {
        Some(list) => apply(list),
        None => CommandOutcome::Unresolved,
    })
}
