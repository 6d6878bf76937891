// SPDX-License-Identifier: MIT

use super::*;

fn write_config_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(PLATFORM_FILE),
        r#"
[scheduler]
port = 24693
agent_update_interval = 30

[directories]
logdir = "/var/log/dispatch"

[hosts]
localhost = "localhost /srv/dispatch 10 all"
worker-a = "10.0.0.5 /srv/dispatch 4 scan"
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join(AGENTS_FILE),
        r#"
[agents.scan]
command = "scan-agent --batch"
max = 4

[agents.maint]
command = "maint-agent"
max = 1
special = ["EXCLUSIVE", "LOCAL"]
"#,
    )
    .unwrap();
    dir
}

#[test]
fn toml_loader_flattens_tables_and_arrays() {
    let dir = write_config_dir();
    let raw = TomlConfigLoader::new(dir.path()).load().unwrap();

    assert_eq!(raw.platform.get("scheduler/port").map(String::as_str), Some("24693"));
    assert_eq!(
        raw.platform.get("hosts/worker-a").map(String::as_str),
        Some("10.0.0.5 /srv/dispatch 4 scan")
    );
    assert_eq!(
        raw.agents.get("agents/maint/special/0").map(String::as_str),
        Some("EXCLUSIVE")
    );
    assert_eq!(
        raw.agents.get("agents/maint/special/1").map(String::as_str),
        Some("LOCAL")
    );
}

#[test]
fn load_snapshot_validates_end_to_end() {
    let dir = write_config_dir();
    let loader = TomlConfigLoader::new(dir.path());
    let snapshot = load_snapshot(&loader).unwrap();

    assert_eq!(snapshot.knobs.port, 24693);
    assert_eq!(
        snapshot.knobs.agent_update_interval,
        std::time::Duration::from_secs(30)
    );
    assert_eq!(snapshot.hosts.len(), 2);
    let maint = snapshot
        .agents
        .iter()
        .find(|m| m.name == "maint")
        .unwrap();
    assert!(maint.flags.exclusive && maint.flags.local);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TomlConfigLoader::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, LoadError::Io { path, .. } if path.ends_with(PLATFORM_FILE)));
}

#[test]
fn broken_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PLATFORM_FILE), "this is not = [toml").unwrap();
    let err = TomlConfigLoader::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
}

#[test]
fn static_loader_serves_fixed_maps() {
    let mut raw = RawConfig::default();
    raw.platform
        .insert("scheduler/port".to_string(), "1".to_string());
    let loader = StaticConfigLoader::new(raw);
    assert_eq!(
        loader.load().unwrap().platform.get("scheduler/port").map(String::as_str),
        Some("1")
    );
}
