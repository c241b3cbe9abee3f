//! Tests for the canvas-embed binary
//!
//! Each test builds a small kiln in a temp directory:
//! - `boards/plan.canvas`: a text card, a file card and a group
//! - `notes/day.md`: a note that embeds one of the cards
//!
//! `XDG_CONFIG_HOME` points into the temp dir so a user config never leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PLAN: &str = r#"{
  "nodes": [
    {"id": "abc123", "type": "text", "text": "Hello **world**", "x": 0, "y": 0, "width": 200, "height": 80},
    {"id": "f00d", "type": "file", "file": "notes/a.md", "x": 300, "y": 0, "width": 200, "height": 80},
    {"id": "9a9", "type": "group", "label": "Later", "x": 0, "y": 200, "width": 500, "height": 300}
  ],
  "edges": []
}"#;

fn kiln() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("boards")).unwrap();
    fs::create_dir_all(root.join("notes")).unwrap();
    fs::create_dir_all(root.join(".config")).unwrap();
    fs::write(root.join("boards/plan.canvas"), PLAN).unwrap();
    fs::write(root.join("notes/a.md"), "# A\n").unwrap();
    fs::write(root.join("notes/day.md"), "# Day").unwrap();
    temp
}

fn canvas_embed(kiln: &Path) -> Command {
    let mut cmd = Command::cargo_bin("canvas-embed").unwrap();
    cmd.env("XDG_CONFIG_HOME", kiln.join(".config"))
        .env_remove("RUST_LOG")
        .arg("--kiln")
        .arg(kiln);
    cmd
}

// ============================================================================
// export
// ============================================================================

#[test]
#[serial]
fn test_export_whole_canvas() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["export", "boards/plan.canvas"])
        .assert()
        .success()
        .stdout(predicate::str::diff("boards/plan.md\n"));

    let content = fs::read_to_string(temp.path().join("boards/plan.md")).unwrap();
    assert_eq!(content, "![[plan.canvas#abc123]]\n![[notes/a.md]]\n");
}

#[test]
#[serial]
fn test_export_never_overwrites() {
    let temp = kiln();
    fs::write(temp.path().join("boards/plan.md"), "mine").unwrap();

    canvas_embed(temp.path())
        .args(["export", "boards/plan.canvas"])
        .assert()
        .success()
        .stdout(predicate::str::contains("boards/plan (1).md"));

    canvas_embed(temp.path())
        .args(["export", "boards/plan.canvas"])
        .assert()
        .success()
        .stdout(predicate::str::contains("boards/plan (2).md"));

    assert_eq!(
        fs::read_to_string(temp.path().join("boards/plan.md")).unwrap(),
        "mine"
    );
}

#[test]
#[serial]
fn test_export_selection_keeps_canvas_order() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["export", "boards/plan.canvas", "--node", "f00d", "-n", "abc123"])
        .assert()
        .success();

    let content = fs::read_to_string(temp.path().join("boards/plan.md")).unwrap();
    assert_eq!(content, "![[plan.canvas#abc123]]\n![[notes/a.md]]");
}

#[test]
#[serial]
fn test_export_unknown_node_fails() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["export", "boards/plan.canvas", "--node", "beef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Node 'beef' not found"));

    assert!(!temp.path().join("boards/plan.md").exists());
}

#[test]
#[serial]
fn test_export_accepts_absolute_path_inside_kiln() {
    let temp = kiln();
    let canvas = temp.path().join("boards/plan.canvas");

    canvas_embed(temp.path())
        .arg("export")
        .arg(&canvas)
        .assert()
        .success()
        .stdout(predicate::str::contains("boards/plan.md"));
}

#[test]
#[serial]
fn test_export_uses_configured_separator() {
    let temp = kiln();
    let config = temp.path().join("embed.toml");
    fs::write(&config, "[export]\nseparator = \"\\n\\n\"\n").unwrap();

    canvas_embed(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["export", "boards/plan.canvas", "-n", "abc123", "-n", "f00d"])
        .assert()
        .success();

    let content = fs::read_to_string(temp.path().join("boards/plan.md")).unwrap();
    assert_eq!(content, "![[plan.canvas#abc123]]\n\n![[notes/a.md]]");
}

#[test]
#[serial]
fn test_invalid_config_is_rejected() {
    let temp = kiln();
    let config = temp.path().join("embed.toml");
    fs::write(&config, "[embed]\nlink_icon_rest_opacity = 3.0\n").unwrap();

    canvas_embed(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["export", "boards/plan.canvas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("link_icon_rest_opacity"));
}

// ============================================================================
// append
// ============================================================================

#[test]
#[serial]
fn test_append_selection_to_note() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["append", "boards/plan.canvas", "notes/day.md", "--node", "abc123"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Selection appended to day.md"));

    let content = fs::read_to_string(temp.path().join("notes/day.md")).unwrap();
    assert_eq!(content, "# Day\n![[plan.canvas#abc123]]");
}

#[test]
#[serial]
fn test_append_to_missing_note_fails() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["append", "boards/plan.canvas", "notes/missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to append to missing.md"));

    assert!(!temp.path().join("notes/missing.md").exists());
}

#[test]
#[serial]
fn test_append_rejects_non_markdown_target() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["append", "boards/plan.canvas", "boards/plan.canvas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a markdown document"));
}

// ============================================================================
// copy-link
// ============================================================================

#[test]
#[serial]
fn test_copy_link_prints_link() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["copy-link", "boards/plan.canvas", "abc123"])
        .assert()
        .success()
        .stdout(predicate::str::diff("![[plan.canvas#abc123]]\n"));

    canvas_embed(temp.path())
        .args(["copy-link", "boards/plan.canvas", "f00d"])
        .assert()
        .success()
        .stdout(predicate::str::diff("![[notes/a.md]]\n"));
}

#[test]
#[serial]
fn test_copy_link_unknown_node_fails() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["copy-link", "boards/plan.canvas", "beef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("beef"));
}

// ============================================================================
// render
// ============================================================================

#[test]
#[serial]
fn test_render_resolves_canvas_embeds() {
    let temp = kiln();
    fs::write(
        temp.path().join("notes/day.md"),
        "# Day\n\n![[plan.canvas#abc123]]\n\nSee [[a]].\n",
    )
    .unwrap();

    canvas_embed(temp.path())
        .args(["render", "notes/day.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<h1>Day</h1>"))
        .stdout(predicate::str::contains("markdown-embed-content"))
        .stdout(predicate::str::contains("<strong>world</strong>"))
        .stdout(predicate::str::contains("aria-label=\"Open in canvas\""))
        .stdout(predicate::str::contains("src=\"boards/plan.canvas#abc123\""))
        .stdout(predicate::str::contains("href=\"notes/a.md\""));
}

#[test]
#[serial]
fn test_render_leaves_unresolvable_embeds_in_place() {
    let temp = kiln();
    fs::write(
        temp.path().join("notes/day.md"),
        "![[gone.canvas#abc123]]\n\n![[photo.png]]\n",
    )
    .unwrap();

    canvas_embed(temp.path())
        .args(["render", "notes/day.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data-node-embed=\"parsed\""))
        .stdout(predicate::str::contains(">gone.canvas#abc123</span>"))
        .stdout(predicate::str::contains(">photo.png</span>"))
        .stdout(predicate::str::contains("markdown-embed-content").not())
        .stderr(predicate::str::contains("Could not resolve canvas node embed"));
}

#[test]
#[serial]
fn test_render_without_link_icon() {
    let temp = kiln();
    let config = temp.path().join("embed.yaml");
    fs::write(&config, "embed:\n  show_link_icon: false\n").unwrap();
    fs::write(temp.path().join("notes/day.md"), "![[plan.canvas#abc123]]").unwrap();

    canvas_embed(temp.path())
        .arg("--config")
        .arg(&config)
        .args(["render", "notes/day.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("markdown-embed-content"))
        .stdout(predicate::str::contains("markdown-embed-link").not());
}

// ============================================================================
// commands
// ============================================================================

#[test]
fn test_commands_for_canvas_with_one_selected_node() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["commands", "--active", "boards/plan.canvas", "--selected", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("canvas-to-new-markdown"))
        .stdout(predicate::str::contains("append-selection-to-markdown"))
        .stdout(predicate::str::contains("copy-card-embed-link"));
}

#[test]
fn test_commands_for_markdown_note() {
    let temp = kiln();

    canvas_embed(temp.path())
        .args(["commands", "--active", "notes/day.md"])
        .assert()
        .success()
        .stdout(predicate::str::diff(
            "canvas-to-new-markdown\tCanvas to new markdown file (retains canvas file)\n",
        ));
}

#[test]
fn test_commands_without_active_document() {
    let temp = kiln();

    canvas_embed(temp.path())
        .arg("commands")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("No commands available"));
}

#[test]
fn test_missing_kiln_fails() {
    let temp = kiln();

    canvas_embed(&temp.path().join("nope"))
        .args(["export", "plan.canvas"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
