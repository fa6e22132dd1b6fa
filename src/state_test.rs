use std::sync::Mutex;

use crate::script::parse_line;
use crate::services::export::ExportError;
use crate::services::persistence::MemoryBlobStore;

use super::*;

const DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<PathBuf>>,
}

impl Launcher for RecordingLauncher {
    fn launch(&self, path: &Path) -> Result<(), ExportError> {
        self.launched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn session_with(store: &Arc<MemoryBlobStore>, launcher: &Arc<RecordingLauncher>, export_dir: PathBuf) -> Session {
    let store: Arc<dyn BlobStore> = store.clone();
    let launcher: Arc<dyn Launcher> = launcher.clone();
    Session::new(store, launcher, export_dir, DEBOUNCE)
}

fn session(store: &Arc<MemoryBlobStore>) -> Session {
    session_with(store, &Arc::new(RecordingLauncher::default()), PathBuf::from("/nonexistent"))
}

async fn run(session: &mut Session, lines: &[&str]) {
    for line in lines {
        let event = parse_line(line).unwrap().expect("event line");
        session.apply(event).await;
    }
}

const STROKE: &[&str] = &[
    r#"{"type":"pointer-down","x":100,"y":100}"#,
    r#"{"type":"pointer-move","x":150,"y":150}"#,
    r#"{"type":"pointer-move","x":200,"y":200}"#,
    r#"{"type":"pointer-up","x":200,"y":200}"#,
];

const OTHER_STROKE: &[&str] = &[
    r#"{"type":"pointer-down","x":500,"y":500}"#,
    r#"{"type":"pointer-move","x":550,"y":520}"#,
    r#"{"type":"pointer-up","x":600,"y":540}"#,
];

async fn settle() {
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(1)).await;
    tokio::task::yield_now().await;
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test(start_paused = true)]
async fn empty_store_starts_with_one_note() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    s.load().await.unwrap();

    let summary = s.summary();
    assert_eq!(summary.notes.len(), 1);
    assert_eq!(summary.current_note_index, 0);
    settle().await;
    assert_eq!(store.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_blob_starts_fresh() {
    let store = Arc::new(MemoryBlobStore::new(Some("not json".into())));
    let mut s = session(&store);
    s.load().await.unwrap();
    assert_eq!(s.summary().notes.len(), 1);
    assert_eq!(s.summary().notes[0].strokes, 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_blob_is_untouched_without_edits() {
    let store = Arc::new(MemoryBlobStore::new(Some("not json".into())));
    let mut s = session(&store);
    s.load().await.unwrap();
    s.shutdown().await;

    assert_eq!(store.writes(), 0);
    assert_eq!(store.read().await.unwrap().as_deref(), Some("not json"));
    assert_eq!(store.quarantined().await, None);
}

#[tokio::test(start_paused = true)]
async fn malformed_blob_is_kept_aside_by_the_first_save() {
    let store = Arc::new(MemoryBlobStore::new(Some("not json".into())));
    let mut s = session(&store);
    s.load().await.unwrap();
    run(&mut s, STROKE).await;
    s.shutdown().await;

    assert_eq!(store.quarantined().await.as_deref(), Some("not json"));
    let blob = store.read().await.unwrap().unwrap();
    assert_eq!(persist::decode(&blob, 0).unwrap().notes[0].lines.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn partly_readable_blob_is_kept_aside_by_the_first_save() {
    let original = r#"{"notes":[{"id":"1","lines":[{"points":[],"width":"wide"}],"textItems":[{"id":"t","content":"kept"}]}]}"#;
    let store = Arc::new(MemoryBlobStore::new(Some(original.into())));
    let mut s = session(&store);
    s.load().await.unwrap();
    assert_eq!(s.summary().notes[0].text_items, 1);
    run(&mut s, STROKE).await;
    s.shutdown().await;

    assert_eq!(store.quarantined().await.as_deref(), Some(original));
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn saved_notebook_reloads_in_a_new_session() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut first = session(&store);
    first.load().await.unwrap();
    run(&mut first, STROKE).await;
    first.shutdown().await;

    let mut second = session(&store);
    second.load().await.unwrap();
    let summary = second.summary();
    assert_eq!(summary.notes.len(), 1);
    assert_eq!(summary.notes[0].strokes, 1);
    assert_eq!(summary.notes[0].objects, 1);
}

// =============================================================================
// Autosave
// =============================================================================

#[tokio::test(start_paused = true)]
async fn stroke_is_saved_after_quiet_period() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    s.load().await.unwrap();
    run(&mut s, STROKE).await;
    assert_eq!(store.writes(), 0);
    assert!(s.stats().saves_requested >= 1);

    run(&mut s, &[r#"{"type":"wait","ms":1001}"#]).await;
    assert_eq!(store.writes(), 1);
    let blob = store.read().await.unwrap().unwrap();
    let loaded = persist::decode(&blob, 0).unwrap();
    assert_eq!(loaded.notes[0].lines.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_is_encoded_once() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(&mut s, STROKE).await;
    run(&mut s, OTHER_STROKE).await;
    run(&mut s, &[r#"{"type":"wait","ms":5000}"#]).await;

    assert!(s.stats().saves_requested >= 2);
    assert_eq!(s.stats().saves_written, 1);
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn due_save_is_written_before_the_next_event() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(&mut s, STROKE).await;
    tokio::time::sleep(DEBOUNCE).await;
    assert_eq!(store.writes(), 0);

    run(&mut s, &[r#"{"type":"tool","tool":"select"}"#]).await;
    assert_eq!(store.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_without_edits_writes_nothing() {
    let store = Arc::new(MemoryBlobStore::new(Some(r#"{"notes":[{"id":"1"}]}"#.into())));
    let mut s = session(&store);
    s.load().await.unwrap();
    s.shutdown().await;
    assert_eq!(store.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_writes_without_waiting() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(&mut s, STROKE).await;
    s.shutdown().await;
    assert_eq!(store.writes(), 1);

    settle().await;
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn auto_export_writes_the_current_note() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryBlobStore::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let mut s = session_with(&store, &launcher, tmp.path().to_path_buf());
    run(&mut s, &[r#"{"type":"settings","settings":{"autoExport":true}}"#]).await;
    run(&mut s, STROKE).await;
    s.shutdown().await;

    let id = s.engine().note().id.clone();
    let exported = std::fs::read_to_string(tmp.path().join(format!("note-{id}.json"))).unwrap();
    assert!(exported.contains("\"lines\""));
}

// =============================================================================
// Events
// =============================================================================

#[tokio::test(start_paused = true)]
async fn wait_separates_stroke_groups() {
    let store = Arc::new(MemoryBlobStore::default());

    let mut quick = session(&store);
    run(&mut quick, STROKE).await;
    run(&mut quick, OTHER_STROKE).await;
    assert_eq!(quick.summary().notes[0].objects, 1);

    let mut slow = session(&store);
    run(&mut slow, STROKE).await;
    run(&mut slow, &[r#"{"type":"wait","ms":600}"#]).await;
    run(&mut slow, OTHER_STROKE).await;
    assert_eq!(slow.summary().notes[0].objects, 2);
}

#[tokio::test(start_paused = true)]
async fn paste_reads_the_scripted_clipboard() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(
        &mut s,
        &[r#"{"type":"clipboard","text":"hello"}"#, r#"{"type":"key","key":"v","mods":{"meta":true}}"#],
    )
    .await;
    let note = s.engine().note();
    assert_eq!(note.text_items.len(), 1);
    assert_eq!(note.text_items[0].content, "hello");
}

#[tokio::test(start_paused = true)]
async fn paste_with_empty_clipboard_changes_nothing() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(&mut s, &[r#"{"type":"paste"}"#]).await;
    assert!(s.engine().note().is_empty());
    assert_eq!(s.stats().saves_requested, 0);
}

#[tokio::test(start_paused = true)]
async fn typed_text_is_kept_after_editing_ends() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(
        &mut s,
        &[
            r#"{"type":"tool","tool":"text"}"#,
            r#"{"type":"pointer-down","x":50,"y":60}"#,
            r#"{"type":"pointer-up","x":50,"y":60}"#,
            r#"{"type":"text","content":"note to self"}"#,
            r#"{"type":"end-text"}"#,
        ],
    )
    .await;
    let note = s.engine().note();
    assert_eq!(note.text_items.len(), 1);
    assert_eq!(note.text_items[0].content, "note to self");
    assert!(s.engine().ui.editing_text.is_none());
}

#[tokio::test]
async fn double_clicking_an_attachment_opens_it() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("report.pdf");
    std::fs::write(&file, b"%PDF").unwrap();

    let store = Arc::new(MemoryBlobStore::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let mut s = session_with(&store, &launcher, tmp.path().to_path_buf());
    let drop = serde_json::json!({
        "type": "drop-file",
        "x": 400,
        "y": 300,
        "path": file.display().to_string(),
        "name": "report.pdf",
        "fileType": "application/pdf",
    })
    .to_string();
    run(&mut s, &[&drop, r#"{"type":"double-click","x":410,"y":310}"#]).await;

    assert_eq!(s.stats().files_opened, 1);
    assert_eq!(*launcher.launched.lock().unwrap(), vec![file]);
}

#[tokio::test]
async fn missing_attachment_is_not_opened() {
    let store = Arc::new(MemoryBlobStore::default());
    let launcher = Arc::new(RecordingLauncher::default());
    let mut s = session_with(&store, &launcher, PathBuf::from("/nonexistent"));
    run(
        &mut s,
        &[
            r#"{"type":"drop-file","x":400,"y":300,"path":"/nonexistent/gone.pdf","name":"gone.pdf"}"#,
            r#"{"type":"double-click","x":410,"y":310}"#,
        ],
    )
    .await;
    assert_eq!(s.stats().files_opened, 0);
    assert!(launcher.launched.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn note_switching_is_reflected_in_summary() {
    let store = Arc::new(MemoryBlobStore::default());
    let mut s = session(&store);
    run(&mut s, STROKE).await;
    run(&mut s, &[r#"{"type":"key","key":"]"}"#]).await;
    let summary = s.summary();
    assert_eq!(summary.notes.len(), 2);
    assert_eq!(summary.current_note_index, 1);
    assert_eq!(summary.notes[0].strokes, 1);
    assert!(s.stats().renders > 0);
    assert_eq!(s.stats().events, 5);
}
