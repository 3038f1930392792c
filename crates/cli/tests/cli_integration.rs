use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("flagbind-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn demo() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flagbind-demo"));
    for key in [
        "LISTEN_ADDR",
        "TARGET_ADDR",
        "TUNNEL_KEY",
        "TUNNEL_MODE",
        "TUNNEL_PEERS",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

fn json_stdout(out: &Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}):\n{}",
            String::from_utf8_lossy(&out.stdout)
        )
    })
}

#[test]
fn help_works() {
    let out = demo()
        .arg("--help")
        .output()
        .expect("failed to run flagbind-demo --help");
    assert_success(&out, "flagbind-demo --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("--env-file") && stdout.contains("--describe"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn generated_help_lists_visible_flags() {
    let out = demo()
        .args(["--", "--help"])
        .output()
        .expect("failed to run flagbind-demo -- --help");
    assert_success(&out, "flagbind-demo -- --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("--listen, -l"), "missing listen:\n{stdout}");
    assert!(stdout.contains("[env: LISTEN_ADDR]"), "missing env:\n{stdout}");
    assert!(stdout.contains("[default: 10s]"), "missing default:\n{stdout}");
    assert!(!stdout.contains("--pprof"), "hidden flag shown:\n{stdout}");
}

#[test]
fn defaults_are_printed_without_args() {
    let out = demo().output().expect("failed to run flagbind-demo");
    assert_success(&out, "flagbind-demo");
    let config = json_stdout(&out);
    assert_eq!(config["listen"], ":29900");
    assert_eq!(config["mode"], "fast");
    assert_eq!(config["mtu"], 1350);
    assert_eq!(config["smuxbuf"], 4194304);
    assert_eq!(config["nocomp"], true);
    assert_eq!(config["keepalive"], "10s");
    assert_eq!(config["shards"], serde_json::json!([1000, 200, 3000]));
    assert_eq!(config["ports"], serde_json::json!([]));
    assert!(
        config["session"]
            .as_str()
            .is_some_and(|s| s.starts_with("pid-")),
        "session not filled by host: {config}"
    );
}

#[test]
fn args_override_defaults() {
    let out = demo()
        .args([
            "--",
            "-l",
            ":4000",
            "--mode",
            "fast2",
            "--nocomp=false",
            "--shards",
            "1,2,3",
            "--keepalive",
            "2m40s",
            "--ds",
            "20",
        ])
        .output()
        .expect("failed to run flagbind-demo");
    assert_success(&out, "flagbind-demo with args");
    let config = json_stdout(&out);
    assert_eq!(config["listen"], ":4000");
    assert_eq!(config["mode"], "fast2");
    assert_eq!(config["nocomp"], false);
    assert_eq!(config["shards"], serde_json::json!([1, 2, 3]));
    assert_eq!(config["keepalive"], "2m 40s");
    assert_eq!(config["datashard"], 20);
}

#[test]
fn env_file_feeds_env_backed_flags() {
    let dir = make_temp_dir("env-file");
    let env_file = dir.join(".env");
    fs::write(
        &env_file,
        "LISTEN_ADDR=:7777\nTUNNEL_MODE=manual\nTUNNEL_PEERS=a:1,b:2\n",
    )
    .expect("failed to write env file");

    let out = demo()
        .arg("--env-file")
        .arg(&env_file)
        .output()
        .expect("failed to run flagbind-demo --env-file");
    assert_success(&out, "flagbind-demo --env-file");
    let config = json_stdout(&out);
    assert_eq!(config["listen"], ":7777");
    assert_eq!(config["mode"], "manual");
    assert_eq!(config["peers"], serde_json::json!(["a:1", "b:2"]));

    let out = demo()
        .arg("--env-file")
        .arg(&env_file)
        .args(["--", "--listen", ":1"])
        .output()
        .expect("failed to run flagbind-demo --env-file");
    assert_success(&out, "flagbind-demo --env-file with args");
    assert_eq!(json_stdout(&out)["listen"], ":1");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn describe_prints_declarations() {
    let out = demo()
        .arg("--describe")
        .output()
        .expect("failed to run flagbind-demo --describe");
    assert_success(&out, "flagbind-demo --describe");
    let rows = json_stdout(&out);
    let rows = rows.as_array().expect("describe output is not an array");
    assert_eq!(rows.len(), 25);
    assert_eq!(rows[0]["name"], "listen");
    assert_eq!(rows[0]["aliases"], serde_json::json!(["l"]));
    assert_eq!(rows[0]["env"], "LISTEN_ADDR");
    assert_eq!(rows[0]["kind"], "string");

    let pprof = rows
        .iter()
        .find(|r| r["name"] == "pprof")
        .expect("pprof not described");
    assert_eq!(pprof["hidden"], true);
    assert!(pprof.get("default").is_none());
}

#[test]
fn bad_values_are_reported() {
    let out = demo()
        .args(["--", "--mode", "turbo"])
        .output()
        .expect("failed to run flagbind-demo");
    assert!(!out.status.success(), "unknown mode was accepted");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("turbo"), "unexpected stderr:\n{stderr}");

    let out = demo()
        .args(["--", "--mtu", "big"])
        .output()
        .expect("failed to run flagbind-demo");
    assert!(!out.status.success(), "non-numeric mtu was accepted");
}
