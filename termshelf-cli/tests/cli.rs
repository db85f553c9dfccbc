use assert_cmd::Command;

#[test]
fn help_mentions_the_shelf_flags() {
    let output = Command::cargo_bin("termshelf-cli")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--list"));
    assert!(stdout.contains("--doc"));
    assert!(stdout.contains("--library"));
}

#[test]
fn list_prints_the_builtin_catalog() {
    let output = Command::cargo_bin("termshelf-cli")
        .unwrap()
        .arg("--list")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("first-floor"));
    assert!(stdout.contains("First Floor"));
    assert!(stdout.contains("Second Floor"));
}

#[test]
fn unknown_document_id_fails_fast() {
    let output = Command::cargo_bin("termshelf-cli")
        .unwrap()
        .args(["--doc", "no-such-binder"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown document id"));
}

#[test]
fn unknown_flags_are_rejected() {
    Command::cargo_bin("termshelf-cli")
        .unwrap()
        .arg("--no-such-flag")
        .assert()
        .failure();
}
