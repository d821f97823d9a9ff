use std::fs;

use yam::diff::compare;
use yam::edit::{EditError, EditSession, SaveError};
use yam::parse::{parse_file, Format};
use yam::path::get_by_path;

#[test]
fn yaml_edit_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.yaml");
    fs::write(&path, "name: demo\nport: 80\n").unwrap();

    let (mut tree, format) = parse_file(&path).unwrap();
    let original = tree.clone();
    let port = get_by_path(&tree, ".port").unwrap();

    let mut session = EditSession::new(false);
    assert_eq!(session.start_edit(&tree, port).unwrap(), "80");
    assert!(session.confirm_edit(&mut tree, "8080").unwrap());
    session.save(&tree, &path, format).unwrap();
    assert!(!session.is_modified());
    assert_eq!(session.undo_len(), 1);

    assert_eq!(fs::read_to_string(&path).unwrap(), "name: demo\nport: 8080\n");

    let (reloaded, _) = parse_file(&path).unwrap();
    assert_eq!(compare(Some(&tree), Some(&reloaded)).summary.total, 0);
    let before = compare(Some(&original), Some(&reloaded));
    // top mapping and `port`
    assert_eq!(before.summary.modified, 2);
}

#[test]
fn json_files_are_saved_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, r#"{"name": "demo", "port": 80}"#).unwrap();

    let (mut tree, format) = parse_file(&path).unwrap();
    assert_eq!(format, Format::Json);
    let port = get_by_path(&tree, ".port").unwrap();

    let mut session = EditSession::new(false);
    session.start_edit(&tree, port).unwrap();
    session.confirm_edit(&mut tree, "81").unwrap();
    session.save(&tree, &path, format).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "{\n  \"name\": \"demo\",\n  \"port\": 81\n}\n"
    );
}

#[test]
fn history_outlives_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.yaml");
    fs::write(&path, "a: one\n").unwrap();

    let (mut tree, format) = parse_file(&path).unwrap();
    let a = get_by_path(&tree, ".a").unwrap();
    let mut session = EditSession::new(false);
    session.start_edit(&tree, a).unwrap();
    session.confirm_edit(&mut tree, "two").unwrap();
    session.save(&tree, &path, format).unwrap();

    assert!(matches!(
        session.save(&tree, &path, format),
        Err(SaveError::NothingToSave)
    ));

    assert!(session.undo(&mut tree));
    assert_eq!(tree.get(a).value(), "one");
    assert!(!session.is_dirty(a));

    assert!(session.redo(&mut tree));
    assert!(session.is_modified());
    session.save(&tree, &path, format).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "a: two\n");
}

#[test]
fn read_only_sessions_never_touch_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.yaml");
    fs::write(&path, "a: one\n").unwrap();

    let (tree, format) = parse_file(&path).unwrap();
    let a = get_by_path(&tree, ".a").unwrap();
    let mut session = EditSession::new(true);

    assert_eq!(session.start_edit(&tree, a), Err(EditError::ReadOnly));
    assert!(matches!(
        session.save(&tree, &path, format),
        Err(SaveError::ReadOnly)
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), "a: one\n");
}

#[test]
fn edited_number_with_yaml_syntax_saves_as_string() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.yaml");
    fs::write(&path, "port: 80\nname: x\n").unwrap();

    let (mut tree, format) = parse_file(&path).unwrap();
    let port = get_by_path(&tree, ".port").unwrap();

    let mut session = EditSession::new(false);
    session.start_edit(&tree, port).unwrap();
    assert!(session.confirm_edit(&mut tree, "host: 80").unwrap());
    session.save(&tree, &path, format).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "port: \"host: 80\"\nname: x\n"
    );
    let (reloaded, _) = parse_file(&path).unwrap();
    let port = get_by_path(&reloaded, ".port").unwrap();
    assert_eq!(reloaded.get(port).value(), "host: 80");
    assert_eq!(reloaded.get(get_by_path(&reloaded, ".name").unwrap()).value(), "x");
}
