mod common;

use std::time::Duration;

use common::{assert_contiguous, names, png, tracked, RecordingFinish};
use upload_control::contract::{MockDeleter, MockUploader, UploadError, UploadResult};
use upload_control::simulate::SimulatedUploader;
use upload_control::{
    BatchStatus, FileId, Handlers, ManagerError, MoveDirection, Stage, UploadConfig,
    UploadManager,
};

async fn manager_with_files(config: UploadConfig, handlers: Handlers, count: usize) -> UploadManager {
    let manager = UploadManager::new(config, handlers);
    let inputs = (0..count)
        .map(|i| png(&format!("{}.png", (b'a' + i as u8) as char), 10))
        .collect();
    manager.add_files(inputs).await;
    manager
}

#[tokio::test]
async fn test_move_file_reorders_and_renumbers() {
    let manager = manager_with_files(UploadConfig::default(), Handlers::new(), 3).await;

    assert!(manager.move_file(0, 2));

    let files = manager.files();
    assert_eq!(names(&files), vec!["b.png", "c.png", "a.png"]);
    assert_contiguous(&files);
}

#[tokio::test]
async fn test_move_file_ignores_bad_indices() {
    let manager = manager_with_files(UploadConfig::default(), Handlers::new(), 2).await;

    assert!(!manager.move_file(0, 5));
    assert!(!manager.move_file(7, 0));
    assert!(!manager.move_file(1, 1));
    assert_eq!(names(&manager.files()), vec!["a.png", "b.png"]);
}

#[tokio::test]
async fn test_move_file_disabled_by_config() {
    let config = UploadConfig {
        disable_sorting: true,
        ..Default::default()
    };
    let manager = manager_with_files(config, Handlers::new(), 2).await;

    assert!(manager.disable_sorting());
    assert!(!manager.move_file(0, 1));
    assert!(!manager.can_move(&manager.files()[0].id));
    assert_eq!(names(&manager.files()), vec!["a.png", "b.png"]);
}

/// A finished file pins every move whose range crosses it.
#[tokio::test]
async fn test_finished_files_are_pinned() {
    let manager = UploadManager::new(UploadConfig::default(), Handlers::new()).with_files(vec![
        tracked("a.png", Stage::Idle),
        tracked("done.png", Stage::Finished),
        tracked("b.png", Stage::Idle),
        tracked("c.png", Stage::Idle),
    ]);
    let files = manager.files();
    assert_contiguous(&files);

    assert!(!manager.move_file(0, 2), "range crosses the finished file");
    assert!(!manager.move_file(1, 3), "finished file itself cannot move");
    assert!(!manager.can_move(&files[1].id));
    assert!(!manager.move_file_by_id(&files[0].id, MoveDirection::Down));

    assert!(manager.move_file(2, 3), "range after the finished file is free");
    assert_eq!(
        names(&manager.files()),
        vec!["a.png", "done.png", "c.png", "b.png"]
    );
}

#[tokio::test]
async fn test_move_file_by_id_one_step() {
    let manager = manager_with_files(UploadConfig::default(), Handlers::new(), 3).await;
    let files = manager.files();

    assert!(!manager.move_file_by_id(&files[0].id, MoveDirection::Up));
    assert!(!manager.move_file_by_id(&files[2].id, MoveDirection::Down));
    assert!(!manager.move_file_by_id(&FileId::from("missing"), MoveDirection::Up));
    assert!(manager.move_file_by_id(&files[2].id, MoveDirection::Up));

    assert_eq!(names(&manager.files()), vec!["a.png", "c.png", "b.png"]);
}

/// Reordering is refused while an upload is in flight.
#[tokio::test]
async fn test_move_file_is_noop_while_processing() {
    let handlers = Handlers::new()
        .with_uploader(SimulatedUploader::new().with_delay(Duration::from_millis(5)));
    let manager = manager_with_files(UploadConfig::default(), handlers, 2).await;

    let (report, moved) = tokio::join!(manager.upload_all_files(), async {
        (manager.is_processing(), manager.move_file(0, 1))
    });

    assert!(report.is_ok());
    assert_eq!(moved, (true, false));
    assert_eq!(names(&manager.files()), vec!["a.png", "b.png"]);
}

/// Reordering is refused while the batch is in ERROR.
#[tokio::test]
async fn test_move_file_is_noop_after_failed_upload() {
    let handlers = Handlers::new()
        .with_uploader(SimulatedUploader::new().fail_file("a.png").fail_file("b.png"));
    let manager = manager_with_files(UploadConfig::default(), handlers, 2).await;
    manager.upload_all_files().await.expect("upload call");
    assert!(manager.is_error());

    assert!(!manager.move_file(0, 1));
}

#[tokio::test]
async fn test_delete_file_renumbers_and_notifies_deleter() {
    let mut deleter = MockDeleter::new();
    deleter
        .expect_delete()
        .withf(|files| files.len() == 1 && files[0].name == "b.png" && files[0].stage() == Stage::Removing)
        .times(1)
        .returning(|_| Ok(Vec::new()));
    let manager =
        manager_with_files(UploadConfig::default(), Handlers::new().with_deleter(deleter), 3).await;
    let id = manager.files()[1].id.clone();

    manager.delete_file(&id).await.expect("delete succeeds");

    let files = manager.files();
    assert_eq!(names(&files), vec!["a.png", "c.png"]);
    assert_contiguous(&files);
    assert!(manager.get_file(&id).is_none());
    assert_eq!(manager.status(), BatchStatus::Idle);
}

#[tokio::test]
async fn test_delete_unknown_file_is_an_error() {
    let manager = manager_with_files(UploadConfig::default(), Handlers::new(), 1).await;

    let err = manager.delete_file(&FileId::from("nope")).await.unwrap_err();

    assert!(matches!(err, ManagerError::FileNotFound(id) if id.as_str() == "nope"));
    assert_eq!(manager.files().len(), 1);
}

#[tokio::test]
async fn test_delete_finished_file_is_refused() {
    let mut deleter = MockDeleter::new();
    deleter.expect_delete().never();
    let manager = UploadManager::new(UploadConfig::default(), Handlers::new().with_deleter(deleter))
        .with_files(vec![tracked("done.png", Stage::Finished), tracked("a.png", Stage::Idle)]);
    let finished_id = manager.files()[0].id.clone();

    manager.delete_file(&finished_id).await.expect("refusal is not an error");

    assert_eq!(manager.files().len(), 2);
}

/// Deleting the last unfinished file completes the batch.
#[tokio::test]
async fn test_delete_leaving_only_finished_files_succeeds_batch() {
    let finish = RecordingFinish::default();
    let manager = UploadManager::new(
        UploadConfig::default(),
        Handlers::new().on_finish(finish.clone()),
    )
    .with_files(vec![tracked("done.png", Stage::Finished), tracked("failed.png", Stage::Failed)]);
    let failed_id = manager.files()[1].id.clone();

    manager.delete_file(&failed_id).await.expect("delete succeeds");

    assert_eq!(manager.status(), BatchStatus::Success);
    let calls = finish.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(names(&calls[0]), vec!["done.png"]);
    assert_eq!(manager.files().len(), 1);
}

#[tokio::test]
async fn test_delete_leaving_only_finished_files_resets_when_configured() {
    let finish = RecordingFinish::default();
    let config = UploadConfig {
        reset_on_finish: true,
        ..Default::default()
    };
    let manager = UploadManager::new(config, Handlers::new().on_finish(finish.clone()))
        .with_files(vec![tracked("done.png", Stage::Finished), tracked("a.png", Stage::Idle)]);
    let id = manager.files()[1].id.clone();

    manager.delete_file(&id).await.expect("delete succeeds");

    assert_eq!(finish.calls().len(), 1);
    assert!(manager.files().is_empty());
    assert_eq!(manager.status(), BatchStatus::Idle);
}

/// A failing delete callback is logged; the file is still removed.
#[tokio::test]
async fn test_delete_file_survives_deleter_error() {
    let mut deleter = MockDeleter::new();
    deleter
        .expect_delete()
        .times(1)
        .returning(|_| Err("storage offline".into()));
    let manager =
        manager_with_files(UploadConfig::default(), Handlers::new().with_deleter(deleter), 2).await;
    let id = manager.files()[0].id.clone();

    manager.delete_file(&id).await.expect("deleter errors are not propagated");

    assert_eq!(names(&manager.files()), vec!["b.png"]);
}

#[tokio::test]
async fn test_delete_all_passes_finished_files_to_deleter() {
    let mut deleter = MockDeleter::new();
    deleter
        .expect_delete()
        .withf(|files| {
            files.len() == 1 && files[0].name == "done.png" && files[0].stage() == Stage::Removing
        })
        .times(1)
        .returning(|files| Ok(files.into_iter().map(|f| UploadResult::success(f.id)).collect()));
    let manager = UploadManager::new(UploadConfig::default(), Handlers::new().with_deleter(deleter))
        .with_files(vec![tracked("done.png", Stage::Finished), tracked("a.png", Stage::Idle)]);

    manager.delete_all_files().await.expect("delete all succeeds");

    assert!(manager.files().is_empty());
    assert_eq!(manager.status(), BatchStatus::Idle);
}

#[tokio::test]
async fn test_delete_all_keeps_files_when_deleter_fails() {
    let mut deleter = MockDeleter::new();
    deleter
        .expect_delete()
        .times(1)
        .returning(|_| Err("storage offline".into()));
    let manager = UploadManager::new(UploadConfig::default(), Handlers::new().with_deleter(deleter))
        .with_files(vec![tracked("done.png", Stage::Finished)]);

    let err = manager.delete_all_files().await.unwrap_err();

    assert!(matches!(err, ManagerError::Host(_)));
    assert_eq!(manager.files().len(), 1);
    assert_eq!(manager.status(), BatchStatus::Error);
}

#[tokio::test]
async fn test_delete_all_without_deleter_clears_list() {
    let manager = manager_with_files(UploadConfig::default(), Handlers::new(), 3).await;

    manager.delete_all_files().await.expect("delete all succeeds");

    assert!(manager.files().is_empty());
    assert!(manager.is_idle());
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let mut uploader = MockUploader::new();
    uploader.expect_upload().returning(|files, _| {
        Ok(files
            .into_iter()
            .map(|f| UploadResult::failure(f.id, UploadError::new("no", "UPLOAD_ERROR")))
            .collect())
    });
    let manager =
        manager_with_files(UploadConfig::default(), Handlers::new().with_uploader(uploader), 2).await;
    manager.upload_all_files().await.expect("upload call");
    assert!(manager.status_is(&[BatchStatus::Error]));

    manager.reset();

    assert!(manager.files().is_empty());
    assert!(manager.status_isnt(&[BatchStatus::Error, BatchStatus::Processing]));
    assert!(manager.is_idle());
}
