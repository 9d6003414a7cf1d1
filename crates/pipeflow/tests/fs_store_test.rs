use futures::executor::block_on;
use pipeflow::{
    Document, DocumentStore, Error, FsDocumentStore, ImageChanges, ImageUpload, decode_image_data,
    encode_image_data,
};
use std::fs;
use std::path::Path;

fn layout() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = dir.path().join("res").join("pipeline");
    fs::create_dir_all(&pipeline).expect("mkdir");
    let source = pipeline.to_string_lossy().into_owned();
    (dir, source)
}

#[test]
fn image_data_round_trips_through_data_uris() {
    let uri = encode_image_data(Path::new("a.JPG"), b"hello");
    assert_eq!(uri, "data:image/jpeg;base64,aGVsbG8=");
    assert_eq!(decode_image_data(&uri).expect("decode"), b"hello");
    assert_eq!(decode_image_data("aGVsbG8=").expect("decode"), b"hello");
    assert!(decode_image_data("data:image/png;base64,@@@").is_err());
}

#[test]
fn unused_images_scan_other_documents() {
    let (_dir, source) = layout();
    let src = Path::new(&source);
    fs::write(src.join("main.json"), r#"{"A": {"template": "shared.png"}}"#).expect("write");
    fs::write(
        src.join("other.json"),
        r#"{"B": {"template": ["shared.png"]}, "C": {"template": "shared.png"}}"#,
    )
    .expect("write");
    fs::write(src.join("broken.json"), "{not json").expect("write");
    fs::write(src.join("notes.txt"), "shared.png").expect("write");

    let report = block_on(FsDocumentStore::new().check_unused_images(
        &source,
        "main.json",
        &["shared.png".to_string(), "lonely.png".to_string()],
    ))
    .expect("check");

    assert_eq!(report.unused, ["lonely.png"]);
    assert_eq!(report.used.len(), 1);
    assert_eq!(report.used[0].path, "shared.png");
    assert_eq!(report.used[0].used_by, ["other.json:B", "other.json:C"]);
}

#[test]
fn image_changes_report_per_path() {
    let (_dir, source) = layout();
    let store = FsDocumentStore::new();
    let image_root = FsDocumentStore::image_root(&source);
    fs::create_dir_all(&image_root).expect("mkdir");
    fs::write(image_root.join("old.png"), b"x").expect("write");

    let changes = ImageChanges {
        deletions: vec!["old.png".into(), "gone.png".into(), "../escape.png".into()],
        uploads: vec![
            ImageUpload {
                path: "deep/new.png".into(),
                base64: "aGk=".into(),
            },
            ImageUpload {
                path: "bad.png".into(),
                base64: "!!!".into(),
            },
        ],
    };
    let report = block_on(store.apply_image_changes(&source, &changes)).expect("apply");

    assert_eq!(report.deleted, ["old.png"]);
    assert_eq!(report.delete_failed.len(), 2);
    assert_eq!(report.delete_failed[0].reason, "File not found");
    assert_eq!(report.saved, ["deep/new.png"]);
    assert_eq!(report.save_failed.len(), 1);
    assert_eq!(report.save_failed[0].path, "bad.png");
    assert_eq!(fs::read(image_root.join("deep/new.png")).expect("read"), b"hi");
}

#[test]
fn save_then_load_keeps_extras_and_order() {
    let (_dir, source) = layout();
    let store = FsDocumentStore::new();
    let doc = Document::parse(r#"{"$schema": "s.json", "Z": {"next": "A"}, "A": {}}"#).expect("doc");
    block_on(store.save_document(&source, "x.json", &doc)).expect("save");
    let back = block_on(store.load_document(&source, "x.json")).expect("load");
    assert_eq!(back, doc);
    let keys: Vec<_> = back.tasks.keys().cloned().collect();
    assert_eq!(keys, ["Z", "A"]);
}

#[test]
fn missing_documents_are_io_errors() {
    let (_dir, source) = layout();
    let err = block_on(FsDocumentStore::new().load_document(&source, "nope.json")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(matches!(
        block_on(FsDocumentStore::new().create_file(&source, "a/b")),
        Err(Error::InvalidFileName(_))
    ));
}
