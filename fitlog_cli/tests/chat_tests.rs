//! Chat tests against a local stand-in for the Gemini endpoint.
//!
//! A one-shot HTTP server answers a single `generateContent` call; the
//! config written to a temporary `XDG_CONFIG_HOME` points the CLI at it.
#![cfg(target_os = "linux")]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::{self, JoinHandle};
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("fitlog"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Serve one request with `status` and `body`; yields the request body
fn serve_once(status: u16, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream);

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).expect("read body");

        let mut stream = reader.into_inner();
        let response = format!(
            "HTTP/1.1 {} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).expect("write response");
        stream.flush().ok();

        String::from_utf8(request_body).unwrap_or_default()
    });

    (base_url, handle)
}

/// Wrap model output the way generateContent returns it
fn candidate(text: &str) -> String {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
    .to_string()
}

fn write_config(config_home: &Path, base_url: &str) {
    let dir = config_home.join("fitlog");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("config.toml"),
        format!(
            "[advice]\nbase_url = \"{}\"\napi_key_env = \"FITLOG_TEST_KEY\"\ntimeout_secs = 10\n",
            base_url
        ),
    )
    .unwrap();
}

fn onboard(data_dir: &Path, config_home: &Path) {
    cli()
        .args(["profile", "set", "--name", "Alex", "--age", "30"])
        .args(["--weight", "70", "--height", "175", "--sex", "male"])
        .args(["--activity", "moderate", "--goal", "maintain"])
        .arg("--data-dir")
        .arg(data_dir)
        .env("XDG_CONFIG_HOME", config_home)
        .assert()
        .success();
}

fn chat(data_dir: &Path, config_home: &Path, text: &str) -> assert_cmd::assert::Assert {
    cli()
        .arg("chat")
        .arg(text)
        .arg("--data-dir")
        .arg(data_dir)
        .env("XDG_CONFIG_HOME", config_home)
        .env("FITLOG_TEST_KEY", "test-key")
        .env("NO_PROXY", "127.0.0.1,localhost")
        .env("no_proxy", "127.0.0.1,localhost")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .assert()
}

fn stored_entries(data_dir: &Path) -> Vec<Value> {
    let path = data_dir.join("store/logs.json");
    if !path.exists() {
        return Vec::new();
    }
    let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    value["data"].as_array().cloned().unwrap_or_default()
}

#[test]
fn test_chat_logs_extracted_meal() {
    let data_dir = setup_test_dir();
    let config_home = setup_test_dir();

    let reply = json!({
        "type": "log",
        "textResponse": "Nice breakfast! Logged it.",
        "logData": { "type": "meal", "calories": 350, "protein": 12, "carbs": 58, "fats": 7 }
    });
    let (base_url, server) = serve_once(200, candidate(&reply.to_string()));
    write_config(config_home.path(), &base_url);
    onboard(data_dir.path(), config_home.path());

    chat(data_dir.path(), config_home.path(), "oatmeal with blueberries")
        .success()
        .stdout(predicate::str::contains("Nice breakfast! Logged it."))
        .stdout(predicate::str::contains("Logged meal: oatmeal with blueberries (350 kcal"));

    // The request carried the message, the profile and the JSON response schema
    let request: Value = serde_json::from_str(&server.join().unwrap()).unwrap();
    let prompt = request["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("oatmeal with blueberries"));
    assert!(prompt.contains("\"name\":\"Alex\""));
    assert_eq!(request["generationConfig"]["responseMimeType"], "application/json");

    let entries = stored_entries(data_dir.path());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "meal");
    assert_eq!(entries[0]["description"], "oatmeal with blueberries");
    assert_eq!(entries[0]["sleep_hours"], 0.0);
}

#[test]
fn test_chat_advice_reply_logs_nothing() {
    let data_dir = setup_test_dir();
    let config_home = setup_test_dir();

    let reply = json!({ "type": "advice", "textResponse": "Aim for 8 hours of sleep." });
    let (base_url, server) = serve_once(200, candidate(&reply.to_string()));
    write_config(config_home.path(), &base_url);
    onboard(data_dir.path(), config_home.path());

    chat(data_dir.path(), config_home.path(), "how much should I sleep?")
        .success()
        .stdout(predicate::str::contains("Aim for 8 hours of sleep."))
        .stdout(predicate::str::contains("Logged").not());

    server.join().unwrap();
    assert!(stored_entries(data_dir.path()).is_empty());
}

#[test]
fn test_chat_service_error_shows_fallback() {
    let data_dir = setup_test_dir();
    let config_home = setup_test_dir();

    let body = json!({ "error": { "code": 500, "message": "backend unavailable" } }).to_string();
    let (base_url, server) = serve_once(500, body);
    write_config(config_home.path(), &base_url);
    onboard(data_dir.path(), config_home.path());

    chat(data_dir.path(), config_home.path(), "ran 5k in 28 minutes")
        .success()
        .stdout(predicate::str::contains("Nothing was logged"));

    server.join().unwrap();
    assert!(stored_entries(data_dir.path()).is_empty());
}

#[test]
fn test_chat_unparsable_model_output_shows_fallback() {
    let data_dir = setup_test_dir();
    let config_home = setup_test_dir();

    let (base_url, server) = serve_once(200, candidate("Sure! You ate about 500 calories."));
    write_config(config_home.path(), &base_url);
    onboard(data_dir.path(), config_home.path());

    chat(data_dir.path(), config_home.path(), "a burger")
        .success()
        .stdout(predicate::str::contains("Nothing was logged"));

    server.join().unwrap();
    assert!(stored_entries(data_dir.path()).is_empty());
}
