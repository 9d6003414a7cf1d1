use futures::executor::block_on;
use pipeflow::{
    AssetAction, Connection, CoreError, DocumentStore, EdgeStyle, Editor, EditorConfig, Error,
    FsDocumentStore, MeasuredSizes, Terminal,
};
use std::fs;
use std::path::{Path, PathBuf};

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn fixture(doc: &str) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = dir.path().join("resource").join("pipeline");
    let images = dir.path().join("resource").join("image");
    fs::create_dir_all(&pipeline).expect("pipeline dir");
    fs::create_dir_all(images.join("ui")).expect("image dir");
    fs::write(pipeline.join("main.json"), doc).expect("write doc");
    fs::write(images.join("ui").join("start.png"), PNG_BYTES).expect("write image");
    let source = pipeline.to_string_lossy().into_owned();
    (dir, source)
}

fn image_path(source: &str, rel: &str) -> PathBuf {
    Path::new(source).parent().expect("parent").join("image").join(rel)
}

#[test]
fn open_attaches_images_and_lays_out() {
    let (_dir, source) = fixture(
        r#"{
            // hand-written
            "Start": {"recognition": "TemplateMatch", "template": "ui/start.png", "next": ["Go", "Lost"]},
            "Go": {"template": ["ui/missing.png"]},
        }"#,
    );
    let (editor, report) = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        EditorConfig::default(),
    ))
    .expect("open");

    assert_eq!(report.placeholders, ["Lost"]);
    assert!(!editor.is_dirty());

    let start = editor.model().node("Start").expect("start");
    assert_eq!(start.assets.images.len(), 1);
    assert_eq!(start.assets.images[0].found, Some(true));
    let data = start.assets.images[0].base64.as_deref().expect("data");
    assert!(data.starts_with("data:image/png;base64,"));

    let go = editor.model().node("Go").expect("go");
    assert_eq!(go.assets.images[0].found, Some(false));

    assert!(go.position.y > start.position.y);
}

#[test]
fn save_writes_document_and_clears_dirty() {
    let (_dir, source) = fixture(r#"{"A": {"timeout": 100}, "B": {}}"#);
    let (mut editor, _) = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        EditorConfig::default(),
    ))
    .expect("open");

    editor
        .model_mut()
        .connect(&Connection::new("A", Terminal::Primary, "B"))
        .expect("connect");
    assert!(editor.is_dirty());

    let report = block_on(editor.save()).expect("save");
    assert!(report.images.is_none());
    assert!(!editor.is_dirty());

    let text = fs::read_to_string(Path::new(&source).join("main.json")).expect("read");
    assert_eq!(
        text,
        "{\n    \"A\": {\n        \"timeout\": 100,\n        \"next\": [\n            \"B\"\n        ]\n    },\n    \"B\": {}\n}\n"
    );
}

#[test]
fn save_applies_staged_image_changes() {
    let (_dir, source) = fixture(r#"{"Start": {"template": ["ui/start.png"]}}"#);
    let (mut editor, _) = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        EditorConfig::default(),
    ))
    .expect("open");

    let model = editor.model_mut();
    model.apply_asset_action(
        "Start",
        AssetAction::StageDelete {
            paths: vec!["ui/start.png".into()],
        },
    );
    model.apply_asset_action(
        "Start",
        AssetAction::StageAdd {
            path: "ui/next.png".into(),
            base64: "data:image/png;base64,iVBORw0KGgo=".into(),
        },
    );

    let unused = block_on(editor.check_staged_deletions()).expect("check");
    assert_eq!(unused.unused, ["ui/start.png"]);

    let report = block_on(editor.save()).expect("save");
    let images = report.images.expect("image report");
    assert_eq!(images.deleted, ["ui/start.png"]);
    assert_eq!(images.saved, ["ui/next.png"]);
    assert!(images.is_clean());

    assert!(!image_path(&source, "ui/start.png").exists());
    assert_eq!(
        fs::read(image_path(&source, "ui/next.png")).expect("written"),
        PNG_BYTES
    );
    assert!(editor.model().pending_assets().is_empty());
    assert!(!editor.is_dirty());
}

#[test]
fn failed_uploads_stay_pending_across_saves() {
    let (_dir, source) = fixture(r#"{"Start": {}}"#);
    let (mut editor, _) = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        EditorConfig::default(),
    ))
    .expect("open");

    editor.model_mut().apply_asset_action(
        "Start",
        AssetAction::StageAdd {
            path: "ui/x.png".into(),
            base64: "!!!not base64!!!".into(),
        },
    );

    let report = block_on(editor.save()).expect("save");
    let images = report.images.expect("image report");
    assert!(images.saved.is_empty());
    assert_eq!(images.save_failed.len(), 1);
    assert_eq!(images.save_failed[0].path, "ui/x.png");
    assert!(!image_path(&source, "ui/x.png").exists());

    let start = editor.model().node("Start").expect("start");
    assert!(start.assets.images.is_empty());
    let pending = editor.model().pending_assets();
    assert_eq!(pending.additions.len(), 1);
    assert_eq!(pending.additions[0].path, "ui/x.png");

    // The next save tries again.
    let again = block_on(editor.save()).expect("save again");
    assert_eq!(again.images.expect("image report").save_failed.len(), 1);
}

#[test]
fn edge_appearances_follow_the_configured_style() {
    let (_dir, source) = fixture(r#"{"A": {"next": ["B"], "on_error": ["[JumpBack]A"]}, "B": {}}"#);
    let config = EditorConfig {
        edge_style: EdgeStyle::Bezier,
        ..EditorConfig::default()
    };
    let (editor, _) = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        config,
    ))
    .expect("open");

    let appearances = editor.edge_appearances();
    let next = &appearances["e-A-B-next"];
    assert_eq!(next.style, EdgeStyle::Bezier);
    assert_eq!(next.label, "next");
    assert!(!next.dashed);

    let back = &appearances["e-A-A-on_error"];
    assert_eq!(back.label, "JumpBack");
    assert!(back.animated && back.dashed);
}

#[test]
fn chain_and_relayout_move_nodes_without_dirtying() {
    let (_dir, source) = fixture(r#"{"R": {"next": ["A", "B"]}, "A": {}, "B": {}, "Z": {}}"#);
    let (mut editor, _) = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        EditorConfig::default(),
    ))
    .expect("open");

    let chain = editor
        .arrange_chain("R", &MeasuredSizes::default())
        .expect("chain");
    assert_eq!(chain.rest.len(), 1);
    let a = editor.model().node("A").expect("A").position;
    let b = editor.model().node("B").expect("B").position;
    assert!(a.x < b.x);
    assert!(editor.arrange_chain("Nope", &MeasuredSizes::default()).is_none());

    editor.relayout(&MeasuredSizes::default());
    assert!(!editor.is_dirty());
}

#[test]
fn create_appends_extension_and_refuses_overwrite() {
    let (_dir, source) = fixture("{}");
    let editor = block_on(Editor::create(
        FsDocumentStore::new(),
        source.as_str(),
        "daily",
        EditorConfig::default(),
    ))
    .expect("create");
    assert_eq!(editor.filename(), "daily.json");
    assert_eq!(editor.model().node_count(), 0);

    let err = block_on(FsDocumentStore::new().create_file(&source, "daily.json")).unwrap_err();
    assert!(matches!(err, Error::FileExists(ref name) if name == "daily.json"));
}

#[test]
fn open_reports_malformed_documents() {
    let (_dir, source) = fixture("[1, 2, 3]");
    let err = block_on(Editor::open(
        FsDocumentStore::new(),
        source.as_str(),
        "main.json",
        EditorConfig::default(),
    ))
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Core(CoreError::MalformedDocument { .. })
    ));
}
