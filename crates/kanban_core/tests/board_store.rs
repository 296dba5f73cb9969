use kanban_core::db::open_db_in_memory;
use kanban_core::{
    AccessError, Board, BoardStore, KanbanConfig, KeyValueStore, ManualClock,
    MemoryKeyValueStore, SqliteKeyValueStore, StorageError, StorageResult, StoreError, TaskPatch,
    ViewScope,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use uuid::Uuid;

type TestStore<'a> = BoardStore<&'a MemoryKeyValueStore, Rc<ManualClock>>;

fn setup(storage: &MemoryKeyValueStore) -> (TestStore<'_>, Rc<ManualClock>) {
    let clock = Rc::new(ManualClock::new(1_000));
    let store =
        BoardStore::open_with_clock(storage, Rc::clone(&clock), &KanbanConfig::default()).unwrap();
    (store, clock)
}

/// Memory store whose writes to one chosen key fail until cleared.
#[derive(Default)]
struct FailingWrites {
    inner: MemoryKeyValueStore,
    failing_key: RefCell<Option<String>>,
}

impl FailingWrites {
    fn fail_on(&self, key: &str) {
        *self.failing_key.borrow_mut() = Some(key.to_string());
    }

    fn heal(&self) {
        *self.failing_key.borrow_mut() = None;
    }
}

impl KeyValueStore for FailingWrites {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.failing_key.borrow().as_deref() == Some(key) {
            return Err(StorageError::from(rusqlite::Error::InvalidQuery));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.inner.remove(key)
    }
}

fn task_ids(board: &Board, list_id: Uuid) -> Vec<Uuid> {
    board
        .list(list_id)
        .unwrap()
        .tasks
        .iter()
        .map(|task| task.id)
        .collect()
}

#[test]
fn sprint_scenario_shows_one_recent_list() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let owner = Uuid::new_v4();

    let board = store.create_board("Sprint 1", owner).unwrap();
    let list_id = store.add_list(board.id, "To Do").unwrap().unwrap();
    store
        .add_task(board.id, list_id, "Write outline", None)
        .unwrap()
        .unwrap();

    let recent = store.recent_lists();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].list.title, "To Do");
    assert_eq!(recent[0].board_id, board.id);
    assert_eq!(recent[0].board_title, "Sprint 1");
    assert_eq!(recent[0].list.tasks.len(), 1);
    assert_eq!(recent[0].list.tasks[0].title, "Write outline");
    assert!(!recent[0].list.tasks[0].completed);
}

#[test]
fn moved_task_shows_up_in_favorites_after_toggle() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let todo = store.add_list(board.id, "To Do").unwrap().unwrap();
    let done = store.add_list(board.id, "Done").unwrap().unwrap();
    let t1 = store.add_task(board.id, todo, "t1", None).unwrap().unwrap();

    store.move_task(board.id, todo, done, t1).unwrap();
    assert!(store.favorite_lists().is_empty());

    store.toggle_list_favorite(board.id, done).unwrap();
    let favorites = store.favorite_lists();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].id, done);
    assert_eq!(favorites[0].title, "Done");
    assert_eq!(favorites[0].tasks.len(), 1);
    assert_eq!(favorites[0].tasks[0].id, t1);
}

#[test]
fn move_there_and_back_lands_at_source_tail() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, clock) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let l1 = store.add_list(board.id, "L1").unwrap().unwrap();
    let l2 = store.add_list(board.id, "L2").unwrap().unwrap();
    let a = store.add_task(board.id, l1, "a", None).unwrap().unwrap();
    let t = store.add_task(board.id, l1, "t", None).unwrap().unwrap();
    let b = store.add_task(board.id, l1, "b", None).unwrap().unwrap();
    let c = store.add_task(board.id, l2, "c", None).unwrap().unwrap();
    let before = store.board(board.id).unwrap().list(l1).unwrap().task(t).cloned();

    clock.advance(10);
    store.move_task(board.id, l1, l2, t).unwrap();
    assert_eq!(task_ids(store.board(board.id).unwrap(), l2), vec![c, t]);

    clock.advance(10);
    store.move_task(board.id, l2, l1, t).unwrap();

    let board_now = store.board(board.id).unwrap();
    assert_eq!(task_ids(board_now, l1), vec![a, b, t]);
    assert_eq!(task_ids(board_now, l2), vec![c]);
    assert_eq!(board_now.list(l1).unwrap().task(t).cloned(), before);
    assert_eq!(board_now.list(l1).unwrap().last_modified, 1_020);
    assert_eq!(board_now.list(l2).unwrap().last_modified, 1_020);
}

#[test]
fn move_with_unknown_source_or_task_changes_nothing() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, clock) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let l1 = store.add_list(board.id, "L1").unwrap().unwrap();
    let l2 = store.add_list(board.id, "L2").unwrap().unwrap();
    let t = store.add_task(board.id, l1, "t", None).unwrap().unwrap();
    let snapshot = store.boards().to_vec();

    clock.advance(50);
    store.move_task(board.id, Uuid::new_v4(), l2, t).unwrap();
    store.move_task(board.id, l2, l1, t).unwrap();
    store.move_task(Uuid::new_v4(), l1, l2, t).unwrap();

    assert_eq!(store.boards(), snapshot.as_slice());
}

#[test]
fn add_delete_move_sequences_are_deterministic() {
    fn replay(store: &mut TestStore<'_>) -> Vec<String> {
        let board = store.create_board("Board", Uuid::nil()).unwrap();
        let l1 = store.add_list(board.id, "L1").unwrap().unwrap();
        let l2 = store.add_list(board.id, "L2").unwrap().unwrap();
        let mut ids = HashMap::new();
        for title in ["a", "b", "c", "d"] {
            let id = store.add_task(board.id, l1, title, None).unwrap().unwrap();
            ids.insert(title, id);
        }
        store.move_task(board.id, l1, l2, ids["b"]).unwrap();
        store.delete_task(board.id, l1, ids["c"]).unwrap();
        store.move_task(board.id, l1, l2, ids["a"]).unwrap();
        store.delete_task(board.id, l2, ids["c"]).unwrap();
        store.move_task(board.id, l2, l1, ids["b"]).unwrap();

        let board = store.board(board.id).unwrap();
        let mut titles: Vec<String> = board
            .lists
            .iter()
            .flat_map(|list| list.tasks.iter().map(|task| task.title.clone()))
            .collect();
        titles.sort();
        titles
    }

    let first_storage = MemoryKeyValueStore::new();
    let second_storage = MemoryKeyValueStore::new();
    let (mut first, _) = setup(&first_storage);
    let (mut second, _) = setup(&second_storage);

    let first_titles = replay(&mut first);
    assert_eq!(first_titles, vec!["a", "b", "d"]);
    assert_eq!(first_titles, replay(&mut second));
}

#[test]
fn deleting_a_board_removes_its_lists_from_every_view() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let keep = store.create_board("Keep", Uuid::new_v4()).unwrap();
    let drop_me = store.create_board("Drop", Uuid::new_v4()).unwrap();
    let kept = store.add_list(keep.id, "kept").unwrap().unwrap();
    let fav = store.add_list(drop_me.id, "fav").unwrap().unwrap();
    let arch = store.add_list(drop_me.id, "arch").unwrap().unwrap();
    store.add_task(drop_me.id, fav, "task", None).unwrap();
    store.toggle_list_favorite(drop_me.id, fav).unwrap();
    store.toggle_list_archive(drop_me.id, arch).unwrap();
    assert_eq!(store.favorite_lists().len(), 1);
    assert_eq!(store.archived_lists().len(), 1);

    store.delete_board(drop_me.id).unwrap();

    assert!(store.board(drop_me.id).is_none());
    assert!(store.favorite_lists().is_empty());
    assert!(store.archived_lists().is_empty());
    let recent = store.recent_lists();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].list.id, kept);
}

#[test]
fn recent_never_includes_archived_lists() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, clock) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let lists: Vec<Uuid> = (0..4)
        .map(|index| {
            store
                .add_list(board.id, format!("list {index}"))
                .unwrap()
                .unwrap()
        })
        .collect();

    let toggles = [0, 1, 1, 2, 0, 3, 0, 2, 2];
    for index in toggles {
        clock.advance(1);
        store.toggle_list_archive(board.id, lists[index]).unwrap();

        let archived: Vec<Uuid> = store.archived_lists().iter().map(|list| list.id).collect();
        let recent = store.recent_lists();
        assert!(recent.iter().all(|entry| !entry.list.is_archived));
        assert!(recent.iter().all(|entry| !archived.contains(&entry.list.id)));
        assert_eq!(recent.len() + archived.len(), lists.len());
    }
}

#[test]
fn recent_orders_by_last_modified_and_caps_at_configured_limit() {
    let storage = MemoryKeyValueStore::new();
    let clock = Rc::new(ManualClock::new(0));
    let config = KanbanConfig {
        recent_limit: 2,
        ..KanbanConfig::default()
    };
    let mut store = BoardStore::open_with_clock(&storage, Rc::clone(&clock), &config).unwrap();
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let mut lists = Vec::new();
    for title in ["old", "mid", "new"] {
        clock.advance(10);
        lists.push(store.add_list(board.id, title).unwrap().unwrap());
    }
    clock.advance(10);
    store.update_list(board.id, lists[0], "old renamed").unwrap();

    let titles: Vec<String> = store
        .recent_lists()
        .into_iter()
        .map(|entry| entry.list.title)
        .collect();
    assert_eq!(titles, vec!["old renamed", "new"]);
    assert_eq!(store.recent_lists_in(ViewScope::AllBoards, 10).len(), 3);
}

#[test]
fn favorite_double_toggle_restores_flag_with_monotonic_timestamp() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, clock) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let list_id = store.add_list(board.id, "L").unwrap().unwrap();

    clock.advance(5);
    store.toggle_list_favorite(board.id, list_id).unwrap();
    let first = store.board(board.id).unwrap().list(list_id).unwrap().clone();
    assert!(first.is_favorite);

    clock.advance(5);
    store.toggle_list_favorite(board.id, list_id).unwrap();
    let second = store.board(board.id).unwrap().list(list_id).unwrap().clone();
    assert!(!second.is_favorite);
    assert!(!second.is_archived);
    assert!(second.last_modified >= first.last_modified);
}

#[test]
fn update_task_merges_patch_and_refreshes_list() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, clock) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let list_id = store.add_list(board.id, "L").unwrap().unwrap();
    let task_id = store
        .add_task(board.id, list_id, "draft", Some("details".to_string()))
        .unwrap()
        .unwrap();

    clock.advance(30);
    store
        .update_task(board.id, list_id, task_id, TaskPatch::default().completed(true))
        .unwrap();

    let list = store.board(board.id).unwrap().list(list_id).unwrap();
    let task = list.task(task_id).unwrap();
    assert!(task.completed);
    assert_eq!(task.title, "draft");
    assert_eq!(task.description.as_deref(), Some("details"));
    assert_eq!(task.created_at, 1_000);
    assert_eq!(list.last_modified, 1_030);
}

#[test]
fn board_and_list_renames_and_deletes() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let board = store.create_board("Draft", Uuid::new_v4()).unwrap();
    let l1 = store.add_list(board.id, "L1").unwrap().unwrap();
    let l2 = store.add_list(board.id, "L2").unwrap().unwrap();

    store.update_board(board.id, "Final").unwrap();
    store.update_list(board.id, l2, "Second").unwrap();
    store.delete_list(board.id, l1).unwrap();

    let loaded = store.board(board.id).unwrap();
    assert_eq!(loaded.title, "Final");
    assert_eq!(loaded.created_at, board.created_at);
    assert_eq!(loaded.lists.len(), 1);
    assert_eq!(loaded.lists[0].title, "Second");
}

#[test]
fn unknown_ids_are_silent_and_skip_persistence() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let notified = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notified);
    store.subscribe(move |_| counter.set(counter.get() + 1));

    let missing = Uuid::new_v4();
    store.update_board(missing, "x").unwrap();
    store.delete_board(missing).unwrap();
    assert_eq!(store.add_list(missing, "x").unwrap(), None);
    assert_eq!(store.add_task(missing, missing, "x", None).unwrap(), None);
    store.toggle_list_archive(missing, missing).unwrap();

    assert_eq!(notified.get(), 0);
    assert_eq!(storage.get("kanban_boards").unwrap(), None);
}

#[test]
fn subscribers_see_persisted_tree_after_each_change() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let seen = Rc::new(Cell::new(0usize));
    let seen_by_listener = Rc::clone(&seen);
    let subscription = store.subscribe(move |boards| seen_by_listener.set(boards.len()));

    store.create_board("One", Uuid::new_v4()).unwrap();
    assert_eq!(seen.get(), 1);
    store.create_board("Two", Uuid::new_v4()).unwrap();
    assert_eq!(seen.get(), 2);

    assert!(store.unsubscribe(subscription));
    store.create_board("Three", Uuid::new_v4()).unwrap();
    assert_eq!(seen.get(), 2);
}

#[test]
fn tree_survives_reload_from_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let storage = SqliteKeyValueStore::try_new(&conn).unwrap();
    let config = KanbanConfig::default();

    let owner = Uuid::new_v4();
    let (board_id, list_id) = {
        let mut store = BoardStore::open(&storage, &config).unwrap();
        let board = store.create_board("Persisted", owner).unwrap();
        let list_id = store.add_list(board.id, "L").unwrap().unwrap();
        store
            .add_task(board.id, list_id, "task", Some("desc".to_string()))
            .unwrap();
        store.toggle_list_favorite(board.id, list_id).unwrap();
        (board.id, list_id)
    };

    let reloaded = BoardStore::open(&storage, &config).unwrap();
    let board = reloaded.board(board_id).unwrap();
    assert_eq!(board.owner_id, owner);
    let list = board.list(list_id).unwrap();
    assert!(list.is_favorite);
    assert_eq!(list.tasks[0].description.as_deref(), Some("desc"));
}

#[test]
fn persisted_record_uses_camel_case_fields() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let board = store.create_board("Board", Uuid::new_v4()).unwrap();
    let list_id = store.add_list(board.id, "L").unwrap().unwrap();
    store.add_task(board.id, list_id, "t", None).unwrap();

    let raw = storage.get("kanban_boards").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json[0]["ownerId"], board.owner_id.to_string());
    assert_eq!(json[0]["createdAt"], 1_000);
    assert_eq!(json[0]["lists"][0]["isFavorite"], false);
    assert_eq!(json[0]["lists"][0]["lastModified"], 1_000);
    assert!(json[0]["lists"][0]["tasks"][0].get("description").is_none());
}

#[test]
fn malformed_board_record_loads_as_empty() {
    let storage = MemoryKeyValueStore::new();
    storage.set("kanban_boards", "[{\"id\": 42").unwrap();

    let (mut store, _) = setup(&storage);
    assert!(store.boards().is_empty());

    store.create_board("Fresh", Uuid::new_v4()).unwrap();
    let (reloaded, _) = setup(&storage);
    assert_eq!(reloaded.boards().len(), 1);
}

#[test]
fn owner_gating_filters_and_rejects() {
    let storage = MemoryKeyValueStore::new();
    let (mut store, _) = setup(&storage);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let board = store.create_board("Alice's", alice).unwrap();
    store.create_board("Bob's", bob).unwrap();
    let list_id = store.add_list(board.id, "L").unwrap().unwrap();
    store.toggle_list_favorite(board.id, list_id).unwrap();

    let owned: Vec<&str> = store
        .boards_for_owner(alice)
        .into_iter()
        .map(|board| board.title.as_str())
        .collect();
    assert_eq!(owned, vec!["Alice's"]);

    assert_eq!(store.authorize(board.id, alice).unwrap().id, board.id);
    assert_eq!(
        store.authorize(board.id, bob).unwrap_err(),
        AccessError::NotOwner {
            board_id: board.id,
            user_id: bob
        }
    );
    let missing = Uuid::new_v4();
    assert_eq!(
        store.authorize(missing, alice).unwrap_err(),
        AccessError::BoardNotFound(missing)
    );

    assert_eq!(store.favorite_lists_in(ViewScope::Owner(alice)).len(), 1);
    assert!(store.favorite_lists_in(ViewScope::Owner(bob)).is_empty());
}

#[test]
fn failed_write_keeps_change_in_memory_and_skips_listeners() {
    let storage = FailingWrites::default();
    let config = KanbanConfig::default();
    let mut store = BoardStore::open(&storage, &config).unwrap();
    let notified = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&notified);
    store.subscribe(move |_| counter.set(counter.get() + 1));

    storage.fail_on(&config.boards_key);
    let err = store.create_board("Offline", Uuid::new_v4()).unwrap_err();

    assert!(matches!(err, StoreError::Storage(_)));
    assert_eq!(store.boards().len(), 1);
    assert_eq!(store.boards()[0].title, "Offline");
    assert_eq!(notified.get(), 0);
    assert_eq!(storage.get(&config.boards_key).unwrap(), None);

    storage.heal();
    let board_id = store.boards()[0].id;
    let list_id = store.add_list(board_id, "Inbox").unwrap().unwrap();
    assert_eq!(notified.get(), 1);

    let reloaded = BoardStore::open(&storage, &config).unwrap();
    assert_eq!(reloaded.boards().len(), 1);
    assert_eq!(reloaded.boards()[0].title, "Offline");
    assert!(reloaded.boards()[0].list(list_id).is_some());
}
