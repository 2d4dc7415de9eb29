use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const NOTES: &str = "# Weekly Notes\n\nShip the <preview> fix & tests.\n\n## Next Steps\n\nReview.\n";

fn cli() -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("markzen-cli")?;
    cmd.env_remove("MARKZEN_LOG");
    Ok(cmd)
}

#[test]
fn export_writes_html_next_to_input() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("notes.md");
    fs::write(&input, NOTES)?;

    cli()?
        .arg("export")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("notes.html"));

    let html = fs::read_to_string(dir.path().join("notes.html"))?;
    assert!(html.contains("<title>notes.md</title>"));
    assert!(html.contains("&lt;preview&gt; fix &amp; tests."));
    assert_eq!(fs::read_to_string(&input)?, NOTES);
    Ok(())
}

#[test]
fn export_reports_missing_input() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    cli()?
        .arg("export")
        .arg(dir.path().join("missing.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: failed to open"));
    Ok(())
}

#[test]
fn stats_json_counts_words() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("notes.md");
    fs::write(&input, "one two three\n\nfour")?;

    let output = cli()?.arg("stats").arg(&input).arg("--json").output()?;
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value["words"], 4);
    assert_eq!(value["paragraphs"], 2);
    assert_eq!(value["lines"], 3);
    Ok(())
}

#[test]
fn outline_lists_headings_with_anchors() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("notes.md");
    fs::write(&input, NOTES)?;

    cli()?
        .arg("outline")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("- Weekly Notes (#weekly-notes)"))
        .stdout(predicate::str::contains("  - Next Steps (#next-steps)"));
    Ok(())
}

#[test]
fn preferences_set_persists_and_show_reads_back() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let root = workspace.path().to_str().ok_or("non-utf8 temp path")?;

    cli()?
        .args([
            "--workspace",
            root,
            "preferences",
            "set",
            "--theme",
            "midnight",
            "--layout",
            "split",
            "--font-size",
            "200",
        ])
        .assert()
        .success();

    let stored = fs::read_to_string(workspace.path().join(".markzen").join("preferences.json"))?;
    let value: serde_json::Value = serde_json::from_str(&stored)?;
    assert_eq!(value["theme"], "midnight");
    assert_eq!(value["layout"], "split");
    assert_eq!(value["editor_config"]["font_size"], 72);

    cli()?
        .args(["--workspace", root, "preferences", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"midnight\""));
    Ok(())
}

#[test]
fn preferences_set_with_unchanged_sidebar_still_writes_file() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let prefs_path = workspace.path().join(".markzen").join("preferences.json");

    cli()?
        .arg("--workspace")
        .arg(workspace.path())
        .args(["preferences", "set", "--sidebar", "false"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated preferences at"));

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&prefs_path)?)?;
    assert_eq!(value["sidebar_visible"], false);

    cli()?
        .arg("--workspace")
        .arg(workspace.path())
        .args(["preferences", "set", "--sidebar", "true"])
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&prefs_path)?)?;
    assert_eq!(value["sidebar_visible"], true);
    Ok(())
}

#[test]
fn preferences_set_rejects_unknown_theme() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    cli()?
        .arg("--workspace")
        .arg(workspace.path())
        .args(["preferences", "set", "--theme", "neon"])
        .assert()
        .failure();
    assert!(!workspace.path().join(".markzen").exists());
    Ok(())
}

#[test]
fn autosave_writes_appended_text() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let file = dir.path().join("draft.md");
    fs::write(&file, "first line\n")?;

    cli()?
        .arg("autosave")
        .arg(&file)
        .args(["--append", "second line\n", "--delay-ms", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Autosaved"));

    assert_eq!(fs::read_to_string(&file)?, "first line\nsecond line\n");
    Ok(())
}
