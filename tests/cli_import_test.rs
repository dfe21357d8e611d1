//! Integration tests for `mw import` / `mw export` and conflict handling.

mod common;

use common::TestEnv;
use predicates::prelude::*;

const TERMINAL: &str = r#"{
    "type": "action",
    "id": "term",
    "label": "Imported terminal",
    "children": [
        {"type": "profile", "id": "p1", "label": "Default", "profile": {"path": "/usr/bin/kitty"}}
    ]
}"#;

fn env_with_terminal() -> TestEnv {
    let env = TestEnv::init();
    env.json(&["action", "add", "Terminal", "--id", "term", "--path", "/usr/bin/xterm"]);
    env
}

fn labels(env: &TestEnv) -> Vec<String> {
    env.json(&["show"])["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|i| i["kind"] == "action")
        .map(|i| i["label"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_import_new_items() {
    let env = TestEnv::init();
    let file = env.write_file(
        "batch.json",
        r#"[{"type": "menu", "id": "m", "label": "Menu"}, {"type": "action", "id": "a", "label": "Act"}]"#,
    );

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "no-import"]);

    assert_eq!(report["imported"], 2);
    assert_eq!(report["rejected"], 0);
    assert_eq!(env.json(&["show"])["count"], 2);
}

#[test]
fn test_import_no_import_keeps_existing() {
    let env = env_with_terminal();
    let file = env.write_file("term.json", TERMINAL);

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "skip"]);

    assert_eq!(report["rejected"], 1);
    assert_eq!(report["items"][0]["outcome"], "rejected");
    assert_eq!(labels(&env), ["Terminal"]);
}

#[test]
fn test_import_override_replaces() {
    let env = env_with_terminal();
    let file = env.write_file("term.json", TERMINAL);

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "override"]);

    assert_eq!(report["items"][0]["outcome"], "overwritten");
    assert_eq!(labels(&env), ["Imported terminal"]);
}

#[test]
fn test_import_renumber_keeps_both() {
    let env = env_with_terminal();
    let file = env.write_file("term.json", TERMINAL);

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "renumber"]);

    assert_eq!(report["items"][0]["outcome"], "renumbered");
    assert_eq!(report["items"][0]["original_id"], "term");
    assert_ne!(report["items"][0]["id"], "term");
    assert_eq!(labels(&env), ["Terminal", "Imported terminal"]);
}

#[test]
fn test_import_dry_run_saves_nothing() {
    let env = env_with_terminal();
    let file = env.write_file("term.json", TERMINAL);

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "override", "--dry-run"]);

    assert_eq!(report["dry_run"], true);
    assert_eq!(labels(&env), ["Terminal"]);
}

#[test]
fn test_import_ask_reads_answer_from_stdin() {
    let env = env_with_terminal();
    let file = env.write_file("term.json", TERMINAL);

    env.mw()
        .args(["import", file.to_str().unwrap(), "--mode", "ask"])
        .write_stdin("o\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""outcome":"overwritten""#))
        .stderr(predicate::str::contains("already used by action 'Terminal'"));
}

#[test]
fn test_import_ask_without_answer_discards() {
    let env = env_with_terminal();
    let file = env.write_file("term.json", TERMINAL);

    let output = env
        .mw()
        .args(["import", file.to_str().unwrap(), "--mode", "ask"])
        .write_stdin("")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(labels(&env), ["Terminal"]);
}

#[test]
fn test_kept_choice_reused_by_later_conflicts() {
    let env = TestEnv::init();
    env.json(&["action", "add", "One", "--id", "a1", "--path", "/bin/true"]);
    env.json(&["action", "add", "Two", "--id", "a2", "--path", "/bin/true"]);
    let file = env.write_file(
        "batch.json",
        r#"[
            {"type": "action", "id": "a1", "label": "One again"},
            {"type": "action", "id": "a2", "label": "Two again"}
        ]"#,
    );

    // One answer for the first conflict, kept for the second
    let report = env.json_with_stdin(
        &["import", file.to_str().unwrap(), "--mode", "ask", "--keep-choice"],
        "r!\n",
    );

    assert_eq!(report["items"][0]["outcome"], "renumbered");
    assert_eq!(report["items"][1]["outcome"], "renumbered");

    let config = env.json(&["config", "show"]);
    assert_eq!(config["last_import_mode"], "renumber");
}

#[test]
fn test_import_rejects_profile_at_top_level() {
    let env = TestEnv::init();
    let file = env.write_file(
        "bad.json",
        r#"{"type": "profile", "id": "p", "label": "P", "profile": {"path": "/bin/true"}}"#,
    );

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "override"]);

    assert_eq!(report["rejected"], 1);
    assert!(report["messages"][0].as_str().unwrap().contains("cannot be a top-level item"));
}

#[test]
fn test_import_unknown_mode_fails() {
    let env = TestEnv::init();
    let file = env.write_file("x.json", "[]");
    env.mw()
        .args(["import", file.to_str().unwrap(), "--mode", "merge"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown import mode"));
}

#[test]
fn test_export_import_roundtrip_into_fresh_store() {
    let source = env_with_terminal();
    let exported = source.mw().arg("export").output().unwrap();
    assert!(exported.status.success());

    let target = TestEnv::init();
    let file = target.write_file("all.json", &String::from_utf8(exported.stdout).unwrap());
    let report = target.json(&["import", file.to_str().unwrap(), "--mode", "no-import"]);

    assert_eq!(report["imported"], 1);
    assert_eq!(report["items"][0]["count"], 2);
    assert_eq!(labels(&target), ["Terminal"]);
}

#[test]
fn test_import_menu_carrying_existing_action_rejected() {
    let env = env_with_terminal();
    let file = env.write_file(
        "menu.json",
        r#"{"type": "menu", "id": "more", "label": "More", "children": [
            {"type": "action", "id": "term", "label": "Second terminal"}
        ]}"#,
    );

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "override"]);

    assert_eq!(report["imported"], 0);
    assert_eq!(report["rejected"], 1);
    assert!(report["messages"][0].as_str().unwrap().contains("contains 'term'"));
    assert_eq!(labels(&env), ["Terminal"]);
}

#[test]
fn test_import_rejects_slash_in_id() {
    let env = TestEnv::init();
    let file = env.write_file("bad.json", r#"{"type": "menu", "id": "a/b", "label": "Slashed"}"#);

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "no-import"]);

    assert_eq!(report["rejected"], 1);
    assert_eq!(env.json(&["show"])["count"], 0);
}

#[test]
fn test_repeated_id_in_one_file_overrides_once() {
    let env = TestEnv::init();
    let file = env.write_file(
        "twice.json",
        r#"[{"type": "menu", "id": "x", "label": "A"}, {"type": "menu", "id": "x", "label": "B"}]"#,
    );

    let report = env.json(&["import", file.to_str().unwrap(), "--mode", "override"]);

    assert_eq!(report["imported"], 1);
    assert_eq!(report["items"][0]["outcome"], "superseded");
    assert_eq!(report["items"][1]["outcome"], "overwritten");
    assert_eq!(env.json(&["show"])["count"], 1);
}
