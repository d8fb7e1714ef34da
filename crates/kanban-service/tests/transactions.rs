mod common;

use common::{column_id, FaultyStore};
use kanban_core::KanbanError;
use kanban_domain::{
    ChangeEvent, ChangeNotifier, ChangePayload, KanbanOperations, NewBoard, NewCard,
};
use kanban_persistence::MemoryStore;
use kanban_service::{BoardService, NoopNotifier};
use mockall::mock;
use mockall::predicate::function;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

mock! {
    pub Notifier {}

    impl ChangeNotifier for Notifier {
        fn publish(&self, event: ChangeEvent);
    }
}

/// Keeps every published event for later inspection.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<ChangeEvent>>,
}

impl Recorder {
    fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(ChangeEvent::event_name)
            .collect()
    }
}

impl ChangeNotifier for Recorder {
    fn publish(&self, event: ChangeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn new_board(title: &str) -> NewBoard {
    NewBoard {
        title: title.to_string(),
        icon: None,
    }
}

struct Faulty {
    service: BoardService,
    store: FaultyStore,
    owner: Uuid,
}

fn faulty() -> Faulty {
    let store = FaultyStore::new(MemoryStore::new());
    let service = BoardService::new(Arc::new(store.clone()), Arc::new(NoopNotifier));
    Faulty {
        service,
        store,
        owner: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn test_failed_reorder_leaves_no_trace() {
    let f = faulty();
    let board = f.service.create_board(f.owner, new_board("Atomic")).await.unwrap();
    let todo = column_id(&board, "To Do");
    let mut ids = Vec::new();
    for title in ["A", "B", "C", "D", "E"] {
        let card = f
            .service
            .create_card(f.owner, todo, NewCard::titled(title))
            .await
            .unwrap();
        ids.push(card.id);
    }
    let before = f.store.snapshot().await;

    ids.reverse();
    f.store.fail_on_write(3);
    let result = f.service.reorder_cards(f.owner, todo, ids.clone()).await;

    assert!(matches!(result, Err(KanbanError::Database(_))));
    assert_eq!(f.store.snapshot().await, before);

    f.store.heal();
    let cards = f.service.reorder_cards(f.owner, todo, ids).await.unwrap();
    let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["E", "D", "C", "B", "A"]);
}

#[tokio::test]
async fn test_failed_cross_column_move_keeps_both_columns() {
    let f = faulty();
    let board = f.service.create_board(f.owner, new_board("Atomic")).await.unwrap();
    let todo = column_id(&board, "To Do");
    let done = column_id(&board, "Done");
    let mut cards = Vec::new();
    for title in ["A", "B", "C"] {
        cards.push(
            f.service
                .create_card(f.owner, todo, NewCard::titled(title))
                .await
                .unwrap(),
        );
    }
    f.service
        .create_card(f.owner, done, NewCard::titled("D"))
        .await
        .unwrap();
    let before = f.store.snapshot().await;

    // The source shift and target shift succeed, the card update fails.
    f.store.fail_on_write(3);
    let result = f.service.move_card(f.owner, cards[0].id, done, 0).await;

    assert!(result.is_err());
    assert_eq!(f.store.snapshot().await, before);
}

#[tokio::test]
async fn test_failed_archive_keeps_card_active() {
    let f = faulty();
    let board = f.service.create_board(f.owner, new_board("Atomic")).await.unwrap();
    let todo = column_id(&board, "To Do");
    let card = f
        .service
        .create_card(f.owner, todo, NewCard::titled("A"))
        .await
        .unwrap();
    f.service
        .create_card(f.owner, todo, NewCard::titled("B"))
        .await
        .unwrap();

    f.store.fail_on_write(2);
    let result = f.service.archive_card(f.owner, card.id).await;
    assert!(result.is_err());

    let state = f.store.snapshot().await;
    let stored = &state.cards[&card.id];
    assert!(!stored.archived);
    assert_eq!(stored.position, 0);
}

#[tokio::test]
async fn test_failed_board_creation_leaves_no_columns() {
    let f = faulty();
    f.store.fail_on_write(3);

    let result = f.service.create_board(f.owner, new_board("Half")).await;

    assert!(result.is_err());
    let state = f.store.snapshot().await;
    assert!(state.boards.is_empty());
    assert!(state.columns.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_event_published_after_commit() {
    let store = MemoryStore::new();
    let observed = store.clone();
    let mut notifier = MockNotifier::new();
    notifier
        .expect_publish()
        .with(function(|event: &ChangeEvent| {
            event.event_name() == "board:created"
        }))
        .times(1)
        .returning(move |event| {
            // The board must already be visible to readers.
            let runtime = tokio::runtime::Handle::current();
            let state = tokio::task::block_in_place(|| runtime.block_on(observed.snapshot()));
            assert!(state.boards.contains_key(&event.board_id));
        });

    let service = BoardService::new(Arc::new(store), Arc::new(notifier));
    service
        .create_board(Uuid::new_v4(), new_board("Visible"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_operation_publishes_nothing() {
    let store = FaultyStore::new(MemoryStore::new());
    let mut notifier = MockNotifier::new();
    notifier.expect_publish().times(0);
    let service = BoardService::new(Arc::new(store.clone()), Arc::new(notifier));

    store.fail_on_write(1);
    let result = service
        .create_board(Uuid::new_v4(), new_board("Never"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_rejected_operation_publishes_nothing() {
    let mut notifier = MockNotifier::new();
    notifier.expect_publish().times(0);
    let service = BoardService::new(Arc::new(MemoryStore::new()), Arc::new(notifier));

    let result = service.delete_card(Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(KanbanError::NotFound(_))));
}

#[tokio::test]
async fn test_event_names_follow_operations() {
    let recorder = Arc::new(Recorder::default());
    let service = BoardService::new(Arc::new(MemoryStore::new()), recorder.clone());
    let owner = Uuid::new_v4();

    let board = service.create_board(owner, new_board("Events")).await.unwrap();
    let todo = column_id(&board, "To Do");
    let done = column_id(&board, "Done");
    let a = service
        .create_card(owner, todo, NewCard::titled("A"))
        .await
        .unwrap();
    let b = service
        .create_card(owner, todo, NewCard::titled("B"))
        .await
        .unwrap();
    service
        .reorder_cards(owner, todo, vec![b.id, a.id])
        .await
        .unwrap();
    service.move_card(owner, a.id, done, 0).await.unwrap();
    service.archive_card(owner, a.id).await.unwrap();
    service.restore_card(owner, a.id).await.unwrap();
    let column = service
        .create_column(owner, board.board.id, "Backlog".to_string())
        .await
        .unwrap();
    service.move_column(owner, column.id, 0).await.unwrap();
    service.delete_card(owner, b.id).await.unwrap();

    assert_eq!(
        recorder.names(),
        vec![
            "board:created",
            "card:created",
            "card:created",
            "cards:reordered",
            "card:moved",
            "card:archived",
            "card:restored",
            "column:created",
            "column:reordered",
            "card:deleted",
        ]
    );

    let events = recorder.events.lock().unwrap();
    assert!(events.iter().all(|e| e.board_id == board.board.id));
    match &events[4].payload {
        ChangePayload::CardMoved {
            from_column_id,
            to_column_id,
            ..
        } => {
            assert_eq!(*from_column_id, todo);
            assert_eq!(*to_column_id, done);
        }
        other => panic!("unexpected payload: {:?}", other),
    }
}

#[tokio::test]
async fn test_noop_move_publishes_nothing() {
    let recorder = Arc::new(Recorder::default());
    let service = BoardService::new(Arc::new(MemoryStore::new()), recorder.clone());
    let owner = Uuid::new_v4();
    let board = service.create_board(owner, new_board("Quiet")).await.unwrap();
    let todo = column_id(&board, "To Do");
    let card = service
        .create_card(owner, todo, NewCard::titled("A"))
        .await
        .unwrap();

    service.move_card(owner, card.id, todo, 0).await.unwrap();

    assert_eq!(recorder.names(), vec!["board:created", "card:created"]);
}

#[tokio::test]
async fn test_cross_board_move_notifies_both_boards() {
    let recorder = Arc::new(Recorder::default());
    let service = BoardService::new(Arc::new(MemoryStore::new()), recorder.clone());
    let owner = Uuid::new_v4();
    let left = service.create_board(owner, new_board("Left")).await.unwrap();
    let right = service.create_board(owner, new_board("Right")).await.unwrap();
    let card = service
        .create_card(owner, column_id(&left, "To Do"), NewCard::titled("A"))
        .await
        .unwrap();

    service
        .move_card(owner, card.id, column_id(&right, "Done"), 0)
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap();
    let moved: Vec<_> = events
        .iter()
        .filter(|e| e.event_name() == "card:moved")
        .map(|e| e.board_id)
        .collect();
    assert_eq!(moved, vec![left.board.id, right.board.id]);
}

#[tokio::test]
async fn test_services_sharing_a_data_file_keep_each_others_cards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kanban.json");
    let owner = Uuid::new_v4();

    let first = BoardService::new(
        Arc::new(MemoryStore::open(&path).await.unwrap()),
        Arc::new(NoopNotifier),
    );
    let board = first.create_board(owner, new_board("Shared")).await.unwrap();
    let todo = column_id(&board, "To Do");
    let second = BoardService::new(
        Arc::new(MemoryStore::open(&path).await.unwrap()),
        Arc::new(NoopNotifier),
    );

    let a = first
        .create_card(owner, todo, NewCard::titled("from A"))
        .await
        .unwrap();
    let b = second
        .create_card(owner, todo, NewCard::titled("from B"))
        .await
        .unwrap();
    assert_eq!((a.position, b.position), (0, 1));

    let reopened = MemoryStore::open(&path).await.unwrap().snapshot().await;
    let mut on_disk: Vec<(String, i32)> = reopened
        .cards
        .values()
        .map(|c| (c.title.clone(), c.position))
        .collect();
    on_disk.sort_by_key(|(_, position)| *position);
    assert_eq!(
        on_disk,
        vec![("from A".to_string(), 0), ("from B".to_string(), 1)]
    );
}
