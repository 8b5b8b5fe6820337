use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn run(req: &serde_json::Value) -> anyhow::Result<String> {
    let mut cmd = Command::cargo_bin("mcp-github-actions-versions")?;
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin({
            let mut b = Vec::new();
            writeln!(b, "{}", input).unwrap();
            b
        })
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    Ok(output)
}

#[test]
fn initialize_and_tools_list() -> anyhow::Result<()> {
    let init_req = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "id": 1,
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "t", "version": "0"}
        }
    });
    let out = run(&init_req)?;
    assert!(out.contains("\"protocolVersion\""));
    assert!(out.contains("\"mcp-github-actions-versions\""));

    let list_req = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "tools/list",
        "id": 2
    });
    let out = run(&list_req)?;
    let v: serde_json::Value = serde_json::from_str(out.trim())?;
    let tools = v["result"]["tools"].as_array().expect("tools array");
    let names: Vec<_> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["get_action_versions", "get_latest_action_version"]);
    for t in tools {
        assert_eq!(t["inputSchema"]["required"], serde_json::json!(["owner"]));
        assert_eq!(t["inputSchema"]["properties"]["repository"]["type"], "string");
    }
    Ok(())
}

#[test]
fn notification_only_input_produces_no_output() {
    let mut cmd = Command::cargo_bin("mcp-github-actions-versions").unwrap();
    cmd.write_stdin("{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn version_flag_prints_and_exits() {
    let mut cmd = Command::cargo_bin("mcp-github-actions-versions").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("mcp-github-actions-versions "));
}

#[test]
fn invalid_api_url_fails_startup() {
    let mut cmd = Command::cargo_bin("mcp-github-actions-versions").unwrap();
    cmd.env("GITHUB_API_URL", "ftp://example.com")
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("GITHUB_API_URL"));
}
