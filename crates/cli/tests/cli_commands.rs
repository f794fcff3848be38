//! Integration tests for the fmstamp binary
//!
//! Each test runs the real binary against a temporary vault.

mod common;

use anyhow::Result;
use chrono::DateTime;
use common::TestVault;
use serde_json::json;

const NOTE: &str = "---\ntitle: A\n---\n# Heading\n\nBody text\n";

fn stamped_vault(config: &str) -> TestVault {
    let vault = TestVault::new();
    vault.configure(config);
    vault.write_note("notes/a.md", NOTE);
    vault
}

#[test]
fn test_init_creates_config_once() -> Result<()> {
    let vault = TestVault::new();

    let result = fmstamp!(vault.path(), "init").assert_success()?;
    assert!(result.contains_stdout("Initialized fmstamp"));
    assert!(vault.path().join(".fmstamp/config.toml").is_file());

    let again = fmstamp!(vault.path(), "init").assert_success()?;
    assert!(again.contains_stdout("already initialized"));
    Ok(())
}

#[test]
fn test_commands_require_a_vault() -> Result<()> {
    let vault = TestVault::new();
    vault.write_note("a.md", NOTE);

    let result = fmstamp!(vault.path(), "stamp", "a.md").assert_failure()?;
    assert!(result.contains_stderr("Not an fmstamp vault"));
    Ok(())
}

#[test]
fn test_stamp_writes_iso_timestamp() -> Result<()> {
    let vault = stamped_vault("");

    fmstamp!(vault.path(), "stamp", "notes/a.md").assert_success()?;

    let metadata = vault.metadata("notes/a.md");
    assert_eq!(metadata["title"], json!("A"));
    let stamp = metadata["modified"].as_str().expect("modified is a string");
    assert!(DateTime::parse_from_rfc3339(stamp).is_ok(), "not ISO 8601: {}", stamp);
    assert!(vault.read_note("notes/a.md").ends_with("---\n# Heading\n\nBody text\n"));
    Ok(())
}

#[test]
fn test_second_stamp_is_too_soon() -> Result<()> {
    let vault = stamped_vault("");

    fmstamp!(vault.path(), "stamp", "notes/a.md").assert_success()?;
    let first = vault.metadata("notes/a.md")["modified"].clone();

    let result = fmstamp!(vault.path(), "stamp", "notes/a.md").assert_success()?;
    assert!(result.contains_stdout("skipped: last update"));
    assert_eq!(vault.metadata("notes/a.md")["modified"], first);
    Ok(())
}

#[test]
fn test_numeric_format_is_stored_as_integer() -> Result<()> {
    let vault = stamped_vault("moment_format = \"X\"");

    fmstamp!(vault.path(), "stamp", "notes/a.md").assert_success()?;
    assert!(vault.metadata("notes/a.md")["modified"].is_i64());
    Ok(())
}

#[test]
fn test_created_date_is_added() -> Result<()> {
    let vault = stamped_vault("created_date_property = \"created\"");

    fmstamp!(vault.path(), "stamp", "notes/a.md").assert_success()?;
    let metadata = vault.metadata("notes/a.md");
    assert!(metadata.contains_key("created"));
    assert!(metadata.contains_key("modified"));
    Ok(())
}

#[test]
fn test_history_log_mode() -> Result<()> {
    let vault = TestVault::new();
    vault.configure("store_history_log = true\nmoment_format = \"YYYY-MM-DD\"");
    vault.write_note("log.md", "---\nmodified: 2001-01-01\n---\n");

    fmstamp!(vault.path(), "stamp", "log.md").assert_success()?;
    let entries = vault.metadata("log.md")["modified"].clone();
    let entries = entries.as_array().expect("modified is a list");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], json!("2001-01-01"));
    Ok(())
}

#[test]
fn test_exclude_folder_blocks_stamp() -> Result<()> {
    let vault = stamped_vault("");
    vault.write_note("templates/daily.md", NOTE);

    let added = fmstamp!(vault.path(), "exclude", "add", "templates/").assert_success()?;
    assert!(added.contains_stdout("Excluded"));
    assert!(!added.contains_stdout("does not exist"));

    let listed = fmstamp!(vault.path(), "exclude", "list").assert_success()?;
    assert!(listed.contains_stdout("templates"));

    let result = fmstamp!(vault.path(), "stamp", "templates/daily.md").assert_success()?;
    assert!(result.contains_stdout("excluded folder"));
    assert!(!vault.metadata("templates/daily.md").contains_key("modified"));

    fmstamp!(vault.path(), "exclude", "remove", "templates").assert_success()?;
    fmstamp!(vault.path(), "stamp", "templates/daily.md").assert_success()?;
    assert!(vault.metadata("templates/daily.md").contains_key("modified"));
    Ok(())
}

#[test]
fn test_exclude_warns_about_missing_folder() -> Result<()> {
    let vault = stamped_vault("");

    let result = fmstamp!(vault.path(), "exclude", "add", "archive").assert_success()?;
    assert!(result.contains_stdout("does not exist"));

    fmstamp!(vault.path(), "exclude", "remove", "nothing-here").assert_failure()?;
    Ok(())
}

#[test]
fn test_exclude_field_blocks_stamp() -> Result<()> {
    let vault = TestVault::new();
    vault.configure("");
    vault.write_note("private.md", "---\nexclude_modified_update: true\n---\n");

    fmstamp!(vault.path(), "stamp", "private.md").assert_success()?;
    assert!(!vault.metadata("private.md").contains_key("modified"));
    Ok(())
}

#[test]
fn test_config_set_and_get() -> Result<()> {
    let vault = stamped_vault("");

    fmstamp!(vault.path(), "config", "set", "timeout", "5").assert_success()?;
    let result = fmstamp!(vault.path(), "config", "get", "timeout").assert_success()?;
    assert_eq!(result.stdout.trim(), "5");

    // camelCase spelling is accepted
    fmstamp!(vault.path(), "config", "set", "momentFormat", "YYYY").assert_success()?;
    let result = fmstamp!(vault.path(), "config", "get", "moment_format").assert_success()?;
    assert_eq!(result.stdout.trim(), "YYYY");

    // Malformed values fall back to the default
    let result = fmstamp!(vault.path(), "config", "set", "history_max_items", "-3").assert_success()?;
    assert!(result.contains_stdout("not accepted"));
    let result = fmstamp!(vault.path(), "config", "get", "history_max_items").assert_success()?;
    assert_eq!(result.stdout.trim(), "0");

    fmstamp!(vault.path(), "config", "get", "no_such_key").assert_failure()?;
    fmstamp!(vault.path(), "config", "set", "no_such_key", "1").assert_failure()?;
    Ok(())
}

#[test]
fn test_config_list_and_example() -> Result<()> {
    let vault = stamped_vault("frontmatter_property = \"updated\"");

    let listed = fmstamp!(vault.path(), "config", "list").assert_success()?;
    assert!(listed.contains_stdout("updated"));
    assert!(listed.contains_stdout("append_maximum_frequency"));

    let example = fmstamp!(vault.path(), "config", "example").assert_success()?;
    assert!(example.contains_stdout("frontmatter_property = \"modified\""));
    Ok(())
}

#[test]
fn test_check_does_not_write() -> Result<()> {
    let vault = stamped_vault("");

    let result = fmstamp!(vault.path(), "check", "notes/a.md").assert_success()?;
    assert!(result.contains_stdout("would write"));
    assert_eq!(vault.read_note("notes/a.md"), NOTE);
    Ok(())
}

#[test]
fn test_stamp_unknown_note_fails() -> Result<()> {
    let vault = stamped_vault("");

    let result = fmstamp!(vault.path(), "stamp", "missing.md").assert_failure()?;
    assert!(result.contains_stderr("missing.md"));
    Ok(())
}

#[test]
fn test_vault_flag_from_elsewhere() -> Result<()> {
    let vault = stamped_vault("");
    let elsewhere = TestVault::new();
    let root = vault.path().to_str().expect("utf-8 temp path");

    fmstamp!(elsewhere.path(), "--vault", root, "stamp", "notes/a.md").assert_success()?;
    assert!(vault.metadata("notes/a.md").contains_key("modified"));
    Ok(())
}

#[test]
fn test_watch_with_typing_input() -> Result<()> {
    let vault = stamped_vault("use_keyup_events = true\ntimeout = 1");
    vault.write_note("b.md", NOTE);

    // Stdin closes after these lines; pending updates still fire
    let result = fmstamp!(vault.path(), "watch")
        .stdin("notes/a.md\tx\nb.md\tShift\n")
        .assert_success()?;
    assert!(result.contains_stderr("Watching"));

    assert!(vault.metadata("notes/a.md").contains_key("modified"));
    assert!(!vault.metadata("b.md").contains_key("modified"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_watch_exits_on_interrupt_with_stdin_open() -> Result<()> {
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    let vault = stamped_vault("use_keyup_events = true");
    let mut child = fmstamp!(vault.path(), "watch").spawn()?;
    // Keep the pipe open so the input reader stays blocked
    let _stdin = child.stdin.take();

    thread::sleep(Duration::from_secs(1));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()?;
    assert!(status.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let exited = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        thread::sleep(Duration::from_millis(50));
    };
    if exited.is_none() {
        child.kill()?;
        anyhow::bail!("watch did not exit after Ctrl-C while stdin stayed open");
    }
    Ok(())
}
