//! CLI integration tests for docvault admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use docvault::store::{SqliteStore, Store};
use docvault::types::Role;
use predicates::prelude::*;
use tempfile::TempDir;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        Command::cargo_bin("docvault")
            .expect("failed to find binary")
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--email",
                "admin@example.com",
                "--password",
                "Admin123456",
                "--non-interactive",
            ])
            .assert()
    }

    fn create_user(&self, email: &str) -> assert_cmd::assert::Assert {
        Command::cargo_bin("docvault")
            .expect("failed to find binary")
            .args([
                "admin",
                "create-user",
                "--data-dir",
                &self.data_dir_str(),
                "--email",
                email,
                "--password",
                "Member123456",
            ])
            .assert()
    }

    fn open_store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("docvault.db")).expect("open store")
    }
}

#[test]
fn test_init_creates_admin_and_bucket() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("admin@example.com"));

    assert!(ctx.data_dir().join("docvault.db").exists());
    assert!(ctx.data_dir().join("storage").join("documents").is_dir());

    let store = ctx.open_store();
    assert!(store.has_admin_profile().expect("query admin"));
    let admin = store
        .get_profile_by_email("admin@example.com")
        .expect("query profile")
        .expect("admin exists");
    assert_eq!(admin.role, Role::Admin);
    // Password is stored hashed, never verbatim.
    assert!(admin.password_hash.starts_with("$argon2id$"));
}

#[test]
fn test_init_refuses_to_run_twice() {
    let ctx = TestContext::new();

    ctx.init().success();
    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_init_non_interactive_requires_credentials() {
    let ctx = TestContext::new();

    Command::cargo_bin("docvault")
        .expect("failed to find binary")
        .args([
            "admin",
            "init",
            "--data-dir",
            &ctx.data_dir_str(),
            "--non-interactive",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email is required"));
}

#[test]
fn test_create_user_requires_init() {
    let ctx = TestContext::new();

    ctx.create_user("member@example.com")
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_create_user_provisions_member() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("member@example.com")
        .success()
        .stdout(predicate::str::contains("member@example.com"));

    let store = ctx.open_store();
    let member = store
        .get_profile_by_email("member@example.com")
        .expect("query profile")
        .expect("member exists");
    assert_eq!(member.role, Role::Member);
}

#[test]
fn test_create_user_rejects_duplicate_email() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("member@example.com").success();
    ctx.create_user("member@example.com")
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_create_user_rejects_bad_email() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("not-an-email")
        .failure()
        .stderr(predicate::str::contains("Invalid email"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    Command::cargo_bin("docvault")
        .expect("failed to find binary")
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
