//! Deployment lock tests

use hookd::deploy::lock::{DeployLock, LockStatus};
use tempfile::TempDir;

// A pid far above any real pid_max, so the liveness probe sees it as dead
const DEAD_PID: i32 = 999_999_999;

fn lock_in(dir: &TempDir) -> DeployLock {
    DeployLock::new(dir.path().join("deploy.lock"))
}

#[tokio::test]
async fn test_status_idle_when_absent() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);
    assert_eq!(lock.status().await, LockStatus::Idle);
}

#[tokio::test]
async fn test_acquire_then_status_busy() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);

    assert!(lock.acquire("svc", std::process::id()).await.unwrap());

    match lock.status().await {
        LockStatus::Busy { project, pid, started } => {
            assert_eq!(project, "svc");
            assert_eq!(pid, std::process::id() as i32);
            assert!(!started.is_empty());
        }
        other => panic!("expected busy, got {:?}", other),
    }
}

#[tokio::test]
async fn test_second_acquire_fails_until_release() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);

    assert!(lock.acquire("svc", std::process::id()).await.unwrap());
    assert!(!lock.acquire("other", std::process::id()).await.unwrap());

    lock.release().await.unwrap();
    assert_eq!(lock.status().await, LockStatus::Idle);
    assert!(lock.acquire("other", std::process::id()).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_acquire_exactly_one_wins() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deploy.lock");

    // Two independent lock handles exercise the filesystem primitive,
    // not the in-process flag
    let lock_a = DeployLock::new(&path);
    let lock_b = DeployLock::new(&path);

    let (a, b) = tokio::join!(
        lock_a.acquire("one", std::process::id()),
        lock_b.acquire("two", std::process::id()),
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a ^ b, "exactly one acquire must win, got {} and {}", a, b);
}

#[tokio::test]
async fn test_dead_pid_reports_stale_without_deleting() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);

    assert!(lock.acquire("svc", std::process::id()).await.unwrap());
    lock.update_pid(DEAD_PID as u32).await.unwrap();

    match lock.status().await {
        LockStatus::Stale { project, pid } => {
            assert_eq!(project, "svc");
            assert_eq!(pid, Some(DEAD_PID));
        }
        other => panic!("expected stale, got {:?}", other),
    }

    // The read path never mutates the record
    assert!(dir.path().join("deploy.lock").is_dir());
    match lock.status().await {
        LockStatus::Stale { .. } => {}
        other => panic!("expected stale to persist, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unparseable_pid_reports_stale() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deploy.lock");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("pid"), "not-a-pid").unwrap();
    std::fs::write(path.join("project"), "svc").unwrap();
    std::fs::write(path.join("started"), "2026-01-01T00:00:00Z").unwrap();

    let lock = lock_in(&dir);
    match lock.status().await {
        LockStatus::Stale { project, pid } => {
            assert_eq!(project, "svc");
            assert_eq!(pid, None);
        }
        other => panic!("expected stale, got {:?}", other),
    }
}

#[tokio::test]
async fn test_partial_record_reads_as_idle() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deploy.lock");
    std::fs::create_dir(&path).unwrap();

    let lock = lock_in(&dir);
    assert_eq!(lock.status().await, LockStatus::Idle);
    // Still not deleted
    assert!(path.is_dir());
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let lock = lock_in(&dir);

    assert!(lock.acquire("svc", std::process::id()).await.unwrap());
    lock.release().await.unwrap();
    lock.release().await.unwrap();
    assert_eq!(lock.status().await, LockStatus::Idle);
}

#[tokio::test]
async fn test_preexisting_record_blocks_acquire() {
    // A record left by another process (or a crash) wins over a fresh
    // handle; stale records require manual clearing
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deploy.lock");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(path.join("pid"), DEAD_PID.to_string()).unwrap();
    std::fs::write(path.join("project"), "crashed-svc").unwrap();
    std::fs::write(path.join("started"), "2026-01-01T00:00:00Z").unwrap();

    let lock = lock_in(&dir);
    assert!(!lock.acquire("svc", std::process::id()).await.unwrap());
}
