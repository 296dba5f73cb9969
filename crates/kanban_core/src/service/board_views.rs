//! Derived read-only views over the board tree.
//!
//! Views are recomputed by full scan on every call and never persisted.
//!
//! # Invariants
//! - `recent_lists` never contains an archived list.
//! - `recent_lists` sorts by `last_modified` descending; ties keep tree order.
//! - `favorite_lists` and `archived_lists` keep board/list order.

use crate::model::board::{Board, BoardList, RecentList};
use crate::model::user::UserId;

/// Number of entries the recent view returns when no limit is configured.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Which boards a derived view scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewScope {
    /// Every board in the store, regardless of owner.
    #[default]
    AllBoards,
    /// Only boards owned by this user.
    Owner(UserId),
}

impl ViewScope {
    pub fn includes(self, board: &Board) -> bool {
        match self {
            Self::AllBoards => true,
            Self::Owner(user_id) => board.is_owned_by(user_id),
        }
    }
}

fn scoped_lists(boards: &[Board], scope: ViewScope) -> impl Iterator<Item = (&Board, &BoardList)> {
    boards
        .iter()
        .filter(move |board| scope.includes(board))
        .flat_map(|board| board.lists.iter().map(move |list| (board, list)))
}

/// Most recently modified non-archived lists, newest first.
pub fn recent_lists(boards: &[Board], scope: ViewScope, limit: usize) -> Vec<RecentList> {
    let mut recent: Vec<RecentList> = scoped_lists(boards, scope)
        .filter(|(_, list)| !list.is_archived)
        .map(|(board, list)| RecentList {
            board_id: board.id,
            board_title: board.title.clone(),
            list: list.clone(),
        })
        .collect();
    // `sort_by` is stable, so equal timestamps keep tree order.
    recent.sort_by(|a, b| b.list.last_modified.cmp(&a.list.last_modified));
    recent.truncate(limit);
    recent
}

/// Lists flagged favorite and not archived.
pub fn favorite_lists(boards: &[Board], scope: ViewScope) -> Vec<BoardList> {
    scoped_lists(boards, scope)
        .filter(|(_, list)| list.is_favorite && !list.is_archived)
        .map(|(_, list)| list.clone())
        .collect()
}

/// Archived lists, favorite or not.
pub fn archived_lists(boards: &[Board], scope: ViewScope) -> Vec<BoardList> {
    scoped_lists(boards, scope)
        .filter(|(_, list)| list.is_archived)
        .map(|(_, list)| list.clone())
        .collect()
}
