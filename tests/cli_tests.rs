#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::NamedTempFile;

#[allow(deprecated)]
fn cli() -> Command {
    Command::cargo_bin("cli").expect("cli binary")
}

fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    cli().write_stdin(script.to_string()).assert()
}

#[test]
fn cli_starts_on_the_default_calendar() {
    run_cli("show\nquit\n")
        .success()
        .stdout(str_contains("Calendar 1 'Standard' (parent: none)"))
        .stdout(str_contains("Mon: 08:00-12:00, 13:00-17:00"))
        .stdout(str_contains("Sat: non-working"));
}

#[test]
fn cli_measures_working_time() {
    run_cli("work 2024-08-05T08:00 2024-08-06T08:00\nwork 2024-08-05 2024-08-10 d\nquit\n")
        .success()
        .stdout(str_contains("Work: 8h"))
        .stdout(str_contains("Work: 5d"));
}

#[test]
fn cli_adds_durations_across_the_weekend() {
    run_cli("date 2024-08-02T08:00 16h\nnext 2024-08-03T10:00\nquit\n")
        .success()
        .stdout(str_contains("Date: 2024-08-05 17:00"))
        .stdout(str_contains("2024-08-05 08:00"));
}

#[test]
fn cli_exceptions_apply_to_derived_calendars() {
    run_cli("derive Site\nexcept 2024-12-25\nworking 2024-12-25\nuse 1\nworking 2024-12-25\nquit\n")
        .success()
        .stdout(str_contains("Created calendar 2."))
        .stdout(str_contains("Exception added."))
        .stdout(str_contains("2024-12-25: false"))
        .stdout(str_contains("2024-12-25: true"));
}

#[test]
fn cli_sets_weekday_hours() {
    run_cli("hours Sat 09:00-13:00\nranges 2024-08-10\nhours Sat nonsense\nquit\n")
        .success()
        .stdout(str_contains("Hours set for Sat."))
        .stdout(str_contains("2024-08-10: 09:00-13:00"))
        .stdout(str_contains("Invalid hours"));
}

#[test]
fn cli_rejects_unknown_input() {
    run_cli("frobnicate\nuse 42\nwork 2024-08-05 2024-08-06 parsecs\nquit\n")
        .success()
        .stdout(str_contains("Unknown command. Type 'help'."))
        .stdout(str_contains("Unknown calendar 42"))
        .stdout(str_contains("Error: unknown time unit 'parsecs'"));
}

#[test]
fn cli_save_and_load_json_round_trip() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "derive Site\nexcept 2024-12-25\nsave json {}\nuse 1\nload json {}\n\
         show\nworking 2024-12-25\nquit\n",
        path, path
    );
    let assert = run_cli(&script).success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Calendar saved to"), "expected save confirmation");
    let after_reload = output
        .split("Calendar loaded from")
        .last()
        .unwrap_or_default();
    assert!(
        after_reload.contains("Calendar 2 'Site' (parent: 1)"),
        "reloaded calendar should become current:\n{}",
        after_reload
    );
    assert!(after_reload.contains("exceptions: 1"));
    assert!(after_reload.contains("2024-12-25: false"));
}

#[test]
fn cli_reads_a_config_file() {
    let tmp = NamedTempFile::new().expect("create temp file");
    std::fs::write(tmp.path(), "default_calendar_name = \"Night Shift\"\n").expect("write config");
    cli()
        .arg("--config")
        .arg(tmp.path())
        .write_stdin("quit\n")
        .assert()
        .success()
        .stdout(str_contains("Calendar 1 'Night Shift' (parent: none)"));
}

#[test]
fn cli_reload_keeps_derived_calendars_attached() {
    let tmp = NamedTempFile::new().expect("create temp file");
    let path = tmp.path().to_string_lossy().replace('\\', "\\\\");
    let script = format!(
        "derive Site\nderive Night\nuse 2\nsave json {}\nload json {}\nuse 3\nshow\nquit\n",
        path, path
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Calendar loaded from"))
        .stdout(str_contains("Calendar 3 'Night' (parent: 2)"));
}
