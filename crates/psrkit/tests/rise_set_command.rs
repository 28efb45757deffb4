use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde_json::Value;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("psrkit-{prefix}-{nanos}"));
    fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn psrkit_in(dir: &PathBuf, args: &[&str]) -> Output {
    let dir_arg = dir.to_string_lossy().to_string();
    Command::new(env!("CARGO_BIN_EXE_psrkit"))
        .args(["--home-dir", &dir_arg, "--cwd", &dir_arg])
        .args(args)
        .env_remove("TEMPO2")
        .env_remove("RUST_LOG")
        .output()
        .expect("psrkit should run")
}

#[test]
fn prints_utc_rise_and_set_lines() {
    let dir = unique_temp_dir("riseset-utc");
    let output = psrkit_in(&dir, &["rise-set", "B1937+21", "gbt", "--mjd", "60370"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2, "stdout: {stdout}");
    let utc = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}$").expect("valid regex");
    let rise = lines[0].strip_prefix("Rise:\t").expect("rise line");
    let set = lines[1].strip_prefix("Set:\t").expect("set line");
    assert!(utc.is_match(rise), "rise: {rise}");
    assert!(utc.is_match(set), "set: {set}");
    assert!(rise.starts_with("2024-03-01 "), "rise: {rise}");
    assert!(rise < set);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn prints_sidereal_times_with_lst_flag() {
    let dir = unique_temp_dir("riseset-lst");
    let output = psrkit_in(
        &dir,
        &["rise-set", "crab", "parkes", "--mjd", "60370", "--lst"],
    );
    assert_eq!(output.status.code(), Some(0));

    let lst = Regex::new(r"^(Rise|Set):\t\d{2}:\d{2}:\d{2}\.\d$").expect("valid regex");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);
    for line in stdout.lines() {
        assert!(lst.is_match(line), "line: {line}");
    }

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn json_report_carries_resolved_names_and_limit() {
    let dir = unique_temp_dir("riseset-json");
    let output = psrkit_in(
        &dir,
        &["rise-set", "B1937+21", "1", "--mjd", "60370", "--json"],
    );
    assert_eq!(output.status.code(), Some(0));

    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(report["source"], "J1939+2134");
    assert_eq!(report["observatory"], "gbt");
    assert_eq!(report["elevation_limit_deg"], 5.5);
    let rise = report["rise_mjd"].as_f64().expect("rise_mjd");
    let set = report["set_mjd"].as_f64().expect("set_mjd");
    assert!(rise > 60_370.0 && rise < 60_371.0, "rise_mjd: {rise}");
    assert!(set > rise && set - rise < 1.0, "set_mjd: {set}");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn explicit_limit_and_coordinates_override_defaults() {
    let dir = unique_temp_dir("riseset-explicit");
    let output = psrkit_in(
        &dir,
        &[
            "rise-set",
            "19:39:38.56 +21:34:59.1",
            "gbt",
            "--when",
            "2024-03-01T00:00:00Z",
            "--elevation-limit",
            "-2",
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(0));

    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(report["source"], "19:39:38.56 +21:34:59.1");
    assert_eq!(report["elevation_limit_deg"], -2.0);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn user_catalog_adds_sources() {
    let dir = unique_temp_dir("riseset-catalog");
    fs::write(
        dir.join("targets.dat"),
        "# my targets\nFRB20121102 05:31:58.70 +33:08:52.5 r1\n",
    )
    .expect("catalog should be writable");

    let output = psrkit_in(
        &dir,
        &[
            "--catalog",
            "targets.dat",
            "rise-set",
            "R1",
            "gbt",
            "--mjd",
            "60370",
            "--json",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(report["source"], "FRB20121102");

    let missing = psrkit_in(
        &dir,
        &["--catalog", "absent.dat", "rise-set", "R1", "gbt", "--mjd", "60370"],
    );
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("failed to read catalog"));

    let _ = fs::remove_dir_all(dir);
}
