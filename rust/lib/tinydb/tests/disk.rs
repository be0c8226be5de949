use std::fs;

use openerp_tinydb::{LINE_SEPARATOR, StoreConfig, TinyDb, TinyDbError};

#[test]
fn set_persists_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = TinyDb::open(dir.path(), "settings").unwrap();
    db.set("name", "a=b\nc").unwrap();
    db.set("volume", &7).unwrap();

    let text = fs::read_to_string(dir.path().join("settings.tinydb")).unwrap();
    assert_eq!(
        text,
        format!("name=a<eq>b<lf>c{0}volume=7{0}", LINE_SEPARATOR)
    );
    assert!(!dir.path().join("settings.tmp").exists());

    let db = TinyDb::open(dir.path(), "settings").unwrap();
    assert_eq!(db.get_str("name").unwrap().as_deref(), Some("a=b\nc"));
    assert_eq!(db.get_int("volume").unwrap(), Some(7));
}

#[test]
fn save_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("nested").join("state");
    let mut db = TinyDb::open(&base, "app").unwrap();
    assert!(!base.exists());

    db.set_array("recent", &["one", "two,three"]).unwrap();
    assert!(base.join("app.tinydb").is_file());
}

#[test]
fn reload_sees_external_edit() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = TinyDb::open(dir.path(), "app").unwrap();
    db.set("x", &1).unwrap();
    db.set("y", &2).unwrap();

    fs::write(dir.path().join("app.tinydb"), "y=2\n").unwrap();
    db.reload().unwrap();
    assert_eq!(db.get_int("x").unwrap(), None);
    assert_eq!(db.get_int("y").unwrap(), Some(2));
}

#[test]
fn malformed_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("app.tinydb"), "ok=1\nno separator here\n").unwrap();
    let err = TinyDb::open(dir.path(), "app").unwrap_err();
    assert!(matches!(err, TinyDbError::Parse { line: 2, .. }));
}

#[test]
fn manual_save_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        auto_save: false,
        ..StoreConfig::new(dir.path(), "manual")
    };
    let path = config.resolve_path();

    let mut db = TinyDb::from_config(&config).unwrap();
    db.transaction(|tx| {
        tx.set("a", &true)?;
        tx.set("b", &2.5f64)?;
        Ok(())
    })
    .unwrap();
    assert!(!path.exists());

    db.save().unwrap();
    let reopened = TinyDb::from_config(&config).unwrap();
    assert_eq!(reopened.get_bool("a").unwrap(), Some(true));
    assert_eq!(reopened.get_double("b").unwrap(), Some(2.5));
}

#[test]
fn save_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = TinyDb::open(dir.path(), "app").unwrap();
    db.set("a", &1).unwrap();
    db.remove("a").unwrap();
    db.set("b", &2).unwrap();

    let text = fs::read_to_string(db.path()).unwrap();
    assert_eq!(text, format!("b=2{}", LINE_SEPARATOR));
}
