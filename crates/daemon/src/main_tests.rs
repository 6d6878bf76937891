// SPDX-License-Identifier: MIT

use super::*;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn default_args() {
    let parsed = parse_args(&[]).unwrap();
    assert_eq!(parsed.config_dir, PathBuf::from(DEFAULT_CONFIG_DIR));
    assert_eq!(parsed.port, None);
    assert!(!parsed.kill);
    assert!(!parsed.force_kill);
}

#[test]
fn all_flags_parse() {
    let parsed = parse_args(&args(&[
        "--config",
        "/tmp/conf",
        "--port",
        "9000",
        "--kill",
        "--force-kill",
    ]))
    .unwrap();
    assert_eq!(parsed.config_dir, PathBuf::from("/tmp/conf"));
    assert_eq!(parsed.port, Some(9000));
    assert!(parsed.kill);
    assert!(parsed.force_kill);
}

#[test]
fn short_flags_parse() {
    let parsed = parse_args(&args(&["-c", "/x", "-p", "1", "-k"])).unwrap();
    assert_eq!(parsed.config_dir, PathBuf::from("/x"));
    assert_eq!(parsed.port, Some(1));
    assert!(parsed.kill);
}

#[test]
fn bad_args_are_rejected() {
    assert!(parse_args(&args(&["--config"])).is_err());
    assert!(parse_args(&args(&["--port", "words"])).is_err());
    assert!(parse_args(&args(&["--frobnicate"])).is_err());
}

#[test]
fn rotation_shifts_old_logs() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join(LOG_FILE);
    std::fs::write(&log, vec![0u8; (MAX_LOG_SIZE + 1) as usize]).unwrap();
    std::fs::write(format!("{}.1", log.display()), b"old").unwrap();

    rotate_log_if_needed(&log);

    assert!(!log.exists());
    assert!(std::fs::metadata(format!("{}.1", log.display())).unwrap().len() > 3);
    assert_eq!(
        std::fs::read(format!("{}.2", log.display())).unwrap(),
        b"old"
    );
}

#[test]
fn small_logs_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join(LOG_FILE);
    std::fs::write(&log, b"short").unwrap();
    rotate_log_if_needed(&log);
    assert!(log.exists());
}
