use std::sync::Arc;

use futures::future::BoxFuture;
use nightfall_engine::{
    config::{BackendKind, EngineConfig},
    dao::{
        models::{SessionRow, Snapshot, SnapshotSource, SnapshotUpdate},
        snapshot_store::{SnapshotBackend, memory::MemorySnapshotStore},
        storage::{StorageError, StorageResult},
    },
    services::{
        backend_probe::{BackendProbe, BackendState},
        snapshot_service::{PersistOutcome, SnapshotService},
    },
    state::{
        PlayerInputs, RoomDefinition, RoomProgress, complete_room, has_all_inputs,
        system_message, team_input_message,
    },
};
use serde_json::{Value, json};
use tempfile::tempdir;

struct DownBackend;

fn refused() -> StorageError {
    StorageError::unavailable(
        "connection refused".into(),
        std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
    )
}

impl SnapshotBackend for DownBackend {
    fn update_snapshot(&self, _: SnapshotUpdate) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Err(refused()) })
    }

    fn get_session(&self, _: &str) -> BoxFuture<'static, StorageResult<Option<SessionRow>>> {
        Box::pin(async { Err(refused()) })
    }
}

#[tokio::test]
async fn unavailable_backend_writes_session_file() {
    let temp = tempdir().unwrap();
    let service = SnapshotService::new(BackendProbe::unavailable(), temp.path());

    let snapshot = Snapshot::new(json!({"room": 1, "done": false}));
    service.persist_snapshot("abc", snapshot.clone()).await.unwrap();

    let contents = std::fs::read_to_string(temp.path().join("abc.snapshot.json")).unwrap();
    let file: Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(file["sessionId"], "abc");
    assert_eq!(file["snapshot"], json!({"room": 1, "done": false}));
    assert!(file["savedAt"].is_u64());

    let loaded = service.load_snapshot("abc").await.unwrap().unwrap();
    assert_eq!(loaded.snapshot, snapshot);
    assert!(service.load_snapshot("xyz").await.unwrap().is_none());
}

#[tokio::test]
async fn list_reports_only_fallback_saves() {
    let temp = tempdir().unwrap();
    let durable = SnapshotService::new(
        BackendProbe::available(Arc::new(MemorySnapshotStore::new())),
        temp.path(),
    );
    let failing = SnapshotService::new(
        BackendProbe::available(Arc::new(DownBackend)),
        temp.path(),
    );

    durable
        .persist_snapshot("in-db", Snapshot::new(json!({"room": 2})))
        .await
        .unwrap();
    failing
        .persist_snapshot("on-disk-b", Snapshot::new(json!({"room": 3})))
        .await
        .unwrap();
    failing
        .persist_snapshot("on-disk-a", Snapshot::new(json!({"room": 4})))
        .await
        .unwrap();

    assert_eq!(
        durable.list_snapshots().await.unwrap(),
        vec!["on-disk-a", "on-disk-b"]
    );
}

#[tokio::test]
async fn mission_progress_survives_a_restart() {
    let temp = tempdir().unwrap();
    let rooms = [
        RoomDefinition::requiring(["oxygen-levels", "hatch-code"]),
        RoomDefinition::requiring(["reactor-sequence"]),
    ];

    let mut inputs = PlayerInputs::new();
    inputs.insert("oxygen-levels".into(), json!("21%"));
    assert!(!has_all_inputs(rooms.first(), &inputs));
    inputs.insert("hatch-code".into(), json!(4417));
    assert!(has_all_inputs(rooms.first(), &inputs));

    let before = RoomProgress::new(rooms.len() as u32);
    let progress = complete_room(&before, 1);
    assert_eq!(before.current_room(), Some(1));
    assert_eq!(progress.current_room(), Some(2));

    let chat = vec![
        team_input_message("engineer", "hatch-code"),
        system_message("Hatch open. Proceed to the reactor."),
    ];
    let snapshot = Snapshot::new(json!({
        "progress": progress,
        "chat": chat,
        "version": 2,
    }));

    {
        let probe = BackendProbe::available(Arc::new(DownBackend));
        let service = SnapshotService::new(probe, temp.path());
        service.persist_snapshot("crew-7", snapshot.clone()).await.unwrap();
    }

    let resumed = SnapshotService::new(BackendProbe::unavailable(), temp.path());
    let loaded = resumed.load_snapshot("crew-7").await.unwrap().unwrap();
    assert_eq!(loaded.loaded_from, SnapshotSource::File);
    assert_eq!(loaded.snapshot, snapshot);

    let restored: RoomProgress =
        serde_json::from_value(loaded.snapshot.as_value()["progress"].clone()).unwrap();
    assert_eq!(restored, progress);
    assert!(complete_room(&restored, 2).is_mission_complete());
}

#[tokio::test]
async fn configured_backend_without_uri_falls_back_to_files() {
    let temp = tempdir().unwrap();
    let config = EngineConfig {
        data_dir: temp.path().to_path_buf(),
        backend: BackendKind::Mongo,
        ..EngineConfig::default()
    };
    let service = SnapshotService::from_config(&config);

    let outcome = service
        .persist_snapshot("crew-9", Snapshot::new(json!({"room": 1})))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        PersistOutcome::Fallback {
            path: temp.path().join("crew-9.snapshot.json")
        }
    );
    assert!(matches!(service.backend_state(), BackendState::Unavailable));
}
