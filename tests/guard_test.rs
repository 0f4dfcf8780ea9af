use barcode_desk::guard::{GuardError, SessionGuard};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const LONG: Duration = Duration::from_secs(600);

fn data_file(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("barcode_database.xlsx")
}

#[test]
fn first_caller_gets_a_fresh_session() {
    let dir = TempDir::new().unwrap();
    let mut guard = SessionGuard::for_data_file(&data_file(&dir), LONG);

    let admission = guard.enter(None).unwrap();

    assert!(admission.fresh);
    assert!(!admission.token.is_empty());
    assert!(guard.is_held());
    assert_eq!(
        guard.lock_path(),
        Path::new(&format!("{}.lock", data_file(&dir).display()))
    );
}

#[test]
fn holder_is_readmitted_with_same_token() {
    let dir = TempDir::new().unwrap();
    let mut guard = SessionGuard::for_data_file(&data_file(&dir), LONG);
    let token = guard.enter(None).unwrap().token;

    let again = guard.enter(Some(&token)).unwrap();

    assert_eq!(again.token, token);
    assert!(!again.fresh);
}

#[test]
fn other_callers_are_rejected_while_held() {
    let dir = TempDir::new().unwrap();
    let mut guard = SessionGuard::for_data_file(&data_file(&dir), LONG);
    let token = guard.enter(None).unwrap().token;

    assert!(matches!(guard.enter(None), Err(GuardError::Occupied)));
    assert!(matches!(
        guard.enter(Some("not-the-token")),
        Err(GuardError::Occupied)
    ));
    assert!(matches!(
        guard.end(Some("not-the-token")),
        Err(GuardError::Occupied)
    ));
    assert!(guard.enter(Some(&token)).is_ok());
}

#[test]
fn ending_releases_the_desk() {
    let dir = TempDir::new().unwrap();
    let mut guard = SessionGuard::for_data_file(&data_file(&dir), LONG);
    let first = guard.enter(None).unwrap().token;

    assert!(guard.end(Some(&first)).unwrap());
    assert!(!guard.is_held());
    assert!(!guard.end(Some(&first)).unwrap());

    let second = guard.enter(None).unwrap();
    assert!(second.fresh);
    assert_ne!(second.token, first);
}

#[test]
fn expired_session_gives_way() {
    let dir = TempDir::new().unwrap();
    let mut guard = SessionGuard::for_data_file(&data_file(&dir), Duration::from_millis(20));
    let first = guard.enter(None).unwrap().token;

    thread::sleep(Duration::from_millis(60));

    assert!(!guard.is_held());
    let second = guard.enter(None).unwrap();
    assert!(second.fresh);
    assert_ne!(second.token, first);
}

#[test]
fn pending_barcode_belongs_to_the_session() {
    let dir = TempDir::new().unwrap();
    let mut guard = SessionGuard::for_data_file(&data_file(&dir), LONG);

    guard.set_pending_barcode("8806198700001".to_string());
    assert_eq!(guard.pending_barcode(), None);

    let token = guard.enter(None).unwrap().token;
    guard.set_pending_barcode("8806198700001".to_string());
    assert_eq!(guard.pending_barcode(), Some("8806198700001"));
    assert_eq!(
        guard.take_pending_barcode(),
        Some("8806198700001".to_string())
    );
    assert_eq!(guard.pending_barcode(), None);

    guard.set_pending_barcode("8806198700002".to_string());
    guard.end(Some(&token)).unwrap();
    guard.enter(None).unwrap();
    assert_eq!(guard.pending_barcode(), None);
}

#[test]
fn guards_sharing_a_file_exclude_each_other() {
    let dir = TempDir::new().unwrap();
    let mut first = SessionGuard::for_data_file(&data_file(&dir), LONG);
    let mut second = SessionGuard::for_data_file(&data_file(&dir), LONG);

    let token = first.enter(None).unwrap().token;
    assert!(matches!(second.enter(None), Err(GuardError::Occupied)));

    first.end(Some(&token)).unwrap();
    assert!(second.enter(None).is_ok());
    assert!(matches!(first.enter(None), Err(GuardError::Occupied)));
}

#[test]
fn dropping_a_guard_releases_the_file_lock() {
    let dir = TempDir::new().unwrap();
    let mut first = SessionGuard::for_data_file(&data_file(&dir), LONG);
    first.enter(None).unwrap();
    drop(first);

    let mut second = SessionGuard::for_data_file(&data_file(&dir), LONG);
    assert!(second.enter(None).unwrap().fresh);
}
