mod helpers;

use assert_cmd::Command;
use helpers::{PolicyDir, RoleBuilder, VerbBuilder};
use predicates::prelude::*;

fn policy() -> PolicyDir {
    let dir = PolicyDir::new();
    dir.write(
        "policy.kdl",
        &[
            VerbBuilder::new("edit")
                .title("Edit article")
                .description("Modify any article")
                .allow(&["editor"])
                .custom("subject.public == true")
                .build(),
            RoleBuilder::new("admin")
                .privileges(&["manage"])
                .includes(&["editor"])
                .build(),
            RoleBuilder::new("editor").privileges(&["edit"]).build(),
        ],
    );
    dir
}

fn authority(dir: &PolicyDir) -> Command {
    let mut cmd = Command::cargo_bin("authority").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("--policy")
        .arg(dir.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_check_allowed_and_denied() {
    let dir = policy();

    authority(&dir)
        .args(["check", "edit", "--role", "editor"])
        .assert()
        .success()
        .stdout("allowed\n");

    authority(&dir)
        .args(["check", "edit", "--role", "viewer"])
        .assert()
        .code(1)
        .stdout("denied\n");

    authority(&dir)
        .args(["check", "edit", "--role", "viewer", "--subject", r#"{"public": true}"#])
        .assert()
        .success();

    // no role: unauthenticated
    authority(&dir)
        .args(["check", "edit", "--subject", r#"{"public": true}"#])
        .assert()
        .code(1);
}

#[test]
fn test_check_invalid_subject() {
    let dir = policy();
    authority(&dir)
        .args(["check", "edit", "--role", "viewer", "--subject", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid subject JSON"));
}

#[test]
fn test_title_describe_privileges() {
    let dir = policy();

    authority(&dir)
        .args(["title", "edit"])
        .assert()
        .success()
        .stdout("Edit article\n");

    authority(&dir)
        .args(["describe", "edit", "--role", "editor"])
        .assert()
        .success()
        .stdout("Modify any article\n");

    authority(&dir)
        .args(["privileges", "admin"])
        .assert()
        .success()
        .stdout("manage\nedit\n");

    authority(&dir)
        .args(["privileges", "admin", "--skip", "editor"])
        .assert()
        .success()
        .stdout("manage\n");
}

#[test]
fn test_validate_summary() {
    let dir = policy();
    authority(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 verbs, 2 roles"))
        .stdout(predicate::str::contains("role admin: includes [editor]"));
}

#[test]
fn test_invalid_policy_reported() {
    let dir = PolicyDir::new();
    dir.write("broken.kdl", &[VerbBuilder::new("edit").custom("subject ==").build()]);
    authority(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid condition expression"));
}
