//! Integration tests for item editing: add, set, remove, show.

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::Value;

/// Store with `tools` > `term` > `p1`.
fn env_with_terminal() -> TestEnv {
    let env = TestEnv::init();
    env.json(&["menu", "add", "Tools", "--id", "tools"]);
    env.json(&["action", "add", "Terminal", "--id", "term", "--parent", "tools"]);
    env.json(&[
        "profile", "add", "tools/term", "Default", "--path", "/usr/bin/xterm", "--id", "p1",
    ]);
    env
}

fn status<'a>(result: &'a Value, path: &str) -> &'a Value {
    result["status"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["path"] == path)
        .unwrap_or_else(|| panic!("no status for {} in {}", path, result))
}

#[test]
fn test_show_lists_tree_in_order() {
    let env = env_with_terminal();
    let shown = env.json(&["show"]);

    assert_eq!(shown["count"], 3);
    let paths: Vec<&str> = shown["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, ["tools", "tools/term", "tools/term/p1"]);
    assert!(shown["items"].as_array().unwrap().iter().all(|i| i["valid"] == true));
}

#[test]
fn test_show_human_marks_invalid_items() {
    let env = TestEnv::init();
    env.json(&["menu", "add", "Empty", "--id", "empty"]);

    env.mw()
        .args(["-H", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("menu Empty (empty) [invalid]"));
}

#[test]
fn test_action_add_with_path_creates_profile() {
    let env = TestEnv::init();
    env.json(&["menu", "add", "Tools", "--id", "tools"]);
    let added = env.json(&[
        "action", "add", "Checksum", "--parent", "tools", "--id", "sum", "--path", "/usr/bin/sha256sum",
        "--parameters", "%f",
    ]);

    assert_eq!(added["path"], "tools/sum");
    assert_eq!(status(&added, "tools/sum")["valid"], true);
    assert_eq!(status(&added, "tools")["valid"], true);

    let exported: Value = serde_json::from_str(
        &String::from_utf8(env.mw().args(["export", "tools/sum"]).output().unwrap().stdout).unwrap(),
    )
    .unwrap();
    assert_eq!(exported[0]["children"][0]["profile"]["parameters"], "%f");
}

#[test]
fn test_generated_ids_use_kind_prefix() {
    let env = TestEnv::init();
    let added = env.json(&["menu", "add", "Tools"]);
    assert!(added["id"].as_str().unwrap().starts_with("menu-"));
}

#[test]
fn test_profile_under_menu_rejected() {
    let env = env_with_terminal();
    env.mw()
        .args(["profile", "add", "tools", "Bad", "--path", "/bin/true"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be placed under a menu"));
}

#[test]
fn test_set_profile_path_marks_action_modified_but_not_menu() {
    let env = env_with_terminal();
    let result = env.json(&["set", "tools/term/p1", "path", "/usr/bin/konsole", "--dry-run"]);

    assert_eq!(result["dry_run"], true);
    assert_eq!(status(&result, "tools/term/p1")["modified"], true);
    assert_eq!(status(&result, "tools/term")["modified"], true);
    assert_eq!(status(&result, "tools")["modified"], false);
}

#[test]
fn test_set_action_label_does_not_escalate_modified() {
    let env = env_with_terminal();
    let result = env.json(&["set", "tools/term", "label", "Console", "--dry-run"]);

    assert_eq!(status(&result, "tools/term")["modified"], true);
    assert_eq!(status(&result, "tools")["modified"], false);
}

#[test]
fn test_set_empty_path_invalidates_up_to_root() {
    let env = env_with_terminal();
    let result = env.json(&["set", "tools/term/p1", "path", "", "--dry-run"]);

    for path in ["tools/term/p1", "tools/term", "tools"] {
        assert_eq!(status(&result, path)["valid"], false, "{}", path);
    }
}

#[test]
fn test_set_saves_without_dry_run() {
    let env = env_with_terminal();
    env.json(&["set", "term", "label", "Console"]);

    let shown = env.json(&["show", "tools/term"]);
    assert_eq!(shown["items"][0]["label"], "Console");
    assert_eq!(shown["items"][0]["modified"], false);
}

#[test]
fn test_set_rejects_foreign_field() {
    let env = env_with_terminal();
    env.mw()
        .args(["set", "tools", "execution-mode", "terminal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not apply to menu items"));
}

#[test]
fn test_remove_reports_parent_flags() {
    let env = env_with_terminal();
    let result = env.json(&["remove", "tools/term/p1"]);

    assert_eq!(result["operation"], "remove");
    assert_eq!(status(&result, "tools/term")["valid"], false);
    assert_eq!(status(&result, "tools")["valid"], false);
    assert_eq!(env.json(&["show"])["count"], 2);
}

#[test]
fn test_unknown_path_fails() {
    let env = env_with_terminal();
    env.mw()
        .args(["remove", "tools/missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Item not found: tools/missing"));
}

#[test]
fn test_parameters_starting_with_dash() {
    let env = TestEnv::init();
    env.json(&[
        "action", "add", "Terminal", "--id", "term", "--path", "/usr/bin/xterm", "--parameters", "-e",
    ]);

    let exported: Value =
        serde_json::from_slice(&env.mw().args(["export", "term"]).output().unwrap().stdout).unwrap();
    assert_eq!(exported[0]["children"][0]["profile"]["parameters"], "-e");
}
