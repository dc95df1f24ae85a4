//! Integration tests for the `mcr-server` HTTP API.
//!
//! Each test starts the server as a child process on a unique port, seeded
//! from `tests/fixtures/seed.json`, makes HTTP requests, and verifies the
//! responses.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

/// Base port is derived from the process id so separate test binaries
/// running in parallel don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 30000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

const STATE_USER: &[(&str, &str)] = &[
    ("x-mcr-role", "mdctmcr-state-user"),
    ("x-mcr-states", "AB"),
    ("x-mcr-full-name", "Thelonious States"),
];

const ADMIN: &[(&str, &str)] = &[
    ("x-mcr-role", "mdctmcr-bor"),
    ("x-mcr-full-name", "Adam Admin"),
];

const HELP_DESK: &[(&str, &str)] = &[
    ("x-mcr-role", "mdctmcr-help-desk"),
    ("x-mcr-full-name", "Help Desk"),
];

const OTHER_STATE_USER: &[(&str, &str)] = &[
    ("x-mcr-role", "mdctmcr-state-user"),
    ("x-mcr-states", "CD"),
    ("x-mcr-full-name", "Other State"),
];

/// Start the server on `port` with the fixture seed.
fn start_server(port: u16) -> Child {
    let seed = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("seed.json");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcr-server"));
    cmd.arg("--port")
        .arg(port.to_string())
        .arg("--seed")
        .arg(seed)
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let child = cmd.spawn().expect("failed to start mcr-server");
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return child;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

fn stop_server(mut child: Child) {
    child.kill().ok();
    child.wait().ok();
}

/// Make an HTTP request and return (status, body).
fn http(
    port: u16,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: Option<&Value>,
) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }
    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    if body.is_some() {
        header_lines.push_str("Content-Type: application/json\r\n");
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        method,
        path,
        port,
        header_lines,
        payload.len(),
        payload
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response(&response)
}

fn json_body(body: &str) -> Value {
    serde_json::from_str(body).expect("valid JSON")
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status = headers
        .lines()
        .next()
        .unwrap_or("")
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let chunked = headers
        .to_lowercase()
        .contains("transfer-encoding: chunked");
    let body = if chunked { decode_chunked(&body) } else { body };

    (status, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

#[test]
fn health_returns_200() {
    let port = next_port();
    let child = start_server(port);

    let (status, body) = http(port, "GET", "/health", &[], None);
    stop_server(child);

    assert_eq!(status, 200);
    assert_eq!(json_body(&body)["status"], "ok");
}

#[test]
fn report_routes_require_a_role() {
    let port = next_port();
    let child = start_server(port);

    let (missing, _) = http(port, "GET", "/reports/MCPAR/AB/mock-report-id", &[], None);
    let (unknown, body) = http(
        port,
        "GET",
        "/reports/MCPAR/AB/mock-report-id",
        &[("x-mcr-role", "some-other-app")],
        None,
    );
    stop_server(child);

    assert_eq!(missing, 401);
    assert_eq!(unknown, 401);
    assert!(json_body(&body)["error"].is_string());
}

#[test]
fn fetch_report_assembles_metadata_content_and_template() {
    let port = next_port();
    let child = start_server(port);

    let (status, body) = http(
        port,
        "GET",
        "/reports/MCPAR/AB/mock-report-id",
        STATE_USER,
        None,
    );
    stop_server(child);

    assert_eq!(status, 200);
    let report = json_body(&body);
    assert_eq!(report["id"], "mock-report-id");
    assert_eq!(report["isComplete"], true);
    assert_eq!(report["status"], "In progress");
    assert_eq!(report["reportingPeriodStartDate"], "2026-01-01");
    assert_eq!(report["fieldData"]["contactName"], "Thelonious States");
    assert_eq!(report["formTemplate"]["id"], "mcpar-template-v1");
    assert_eq!(report["fieldDataVersion"], 0);
}

#[test]
fn missing_and_dangling_reports_are_404() {
    let port = next_port();
    let child = start_server(port);

    let (missing, missing_body) = http(port, "GET", "/reports/MCPAR/AB/nope", STATE_USER, None);
    let (dangling, _) = http(
        port,
        "GET",
        "/reports/MCPAR/AB/dangling-report-id",
        STATE_USER,
        None,
    );
    stop_server(child);

    assert_eq!(missing, 404);
    assert_eq!(json_body(&missing_body)["error"], "No matching record found");
    assert_eq!(dangling, 404);
}

#[test]
fn unknown_report_type_is_400() {
    let port = next_port();
    let child = start_server(port);

    let (status, _) = http(port, "GET", "/reports/FOO/AB/mock-report-id", STATE_USER, None);
    stop_server(child);

    assert_eq!(status, 400);
}

#[test]
fn empty_path_segment_is_400() {
    let port = next_port();
    let child = start_server(port);

    let (fetch, fetch_body) = http(
        port,
        "GET",
        "/reports/MCPAR//mock-report-id",
        STATE_USER,
        None,
    );
    let (delete, _) = http(
        port,
        "DELETE",
        "/reports/MCPAR/AB/mock-report-id/entities//mock-id-1",
        STATE_USER,
        None,
    );
    stop_server(child);

    assert_eq!(fetch, 400);
    assert_eq!(json_body(&fetch_body)["error"], "Must provide key for table");
    assert_eq!(delete, 400);
}

#[test]
fn out_of_scope_state_is_403() {
    let port = next_port();
    let child = start_server(port);

    let (status, body) = http(
        port,
        "GET",
        "/reports/MCPAR/AB/mock-report-id",
        OTHER_STATE_USER,
        None,
    );
    stop_server(child);

    assert_eq!(status, 403);
    assert_eq!(
        json_body(&body)["error"],
        "User is not authorized to access this page."
    );
}

#[test]
fn list_by_state_returns_summaries() {
    let port = next_port();
    let child = start_server(port);

    let (status, body) = http(port, "GET", "/reports/MCPAR/AB", STATE_USER, None);
    stop_server(child);

    assert_eq!(status, 200);
    let summaries = json_body(&body);
    let summaries = summaries.as_array().expect("array of summaries");
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.get("fieldData").is_none()));
}

#[test]
fn entity_add_then_delete_round_trips() {
    let port = next_port();
    let child = start_server(port);
    let base = "/reports/MCPAR/AB/mock-report-id/entities/accessMeasures";

    let (added_status, added_body) = http(
        port,
        "POST",
        base,
        STATE_USER,
        Some(&json!({"fields": {"accessMeasure_generalCategory": "mock input 2"}, "expectedVersion": 0})),
    );
    let added = json_body(&added_body);
    let entity_id = added["entityId"].as_str().unwrap_or_default().to_string();

    let (deleted_status, deleted_body) = http(
        port,
        "DELETE",
        &format!("{base}/{entity_id}?expectedVersion=1"),
        STATE_USER,
        None,
    );
    stop_server(child);

    assert_eq!(added_status, 201);
    assert_eq!(added["changed"], true);
    let entities = added["report"]["fieldData"]["accessMeasures"]
        .as_array()
        .expect("entity array");
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0]["id"], "mock-id-1");

    assert_eq!(deleted_status, 200);
    let deleted = json_body(&deleted_body);
    assert_eq!(
        deleted["report"]["fieldData"]["accessMeasures"],
        json!([{"id": "mock-id-1", "accessMeasure_generalCategory": "mock input 1"}])
    );
    assert_eq!(deleted["report"]["fieldDataVersion"], 2);
}

#[test]
fn stale_version_is_409() {
    let port = next_port();
    let child = start_server(port);

    let (status, _) = http(
        port,
        "PUT",
        "/reports/MCPAR/AB/mock-report-id/entities/accessMeasures/mock-id-1",
        STATE_USER,
        Some(&json!({"fields": {"accessMeasure_generalCategory": "changed"}, "expectedVersion": 7})),
    );
    stop_server(child);

    assert_eq!(status, 409);
}

#[test]
fn help_desk_can_read_but_not_write() {
    let port = next_port();
    let child = start_server(port);

    let (read, _) = http(port, "GET", "/reports/MCPAR/AB/mock-report-id", HELP_DESK, None);
    let (write, _) = http(
        port,
        "PUT",
        "/reports/MCPAR/AB/mock-report-id",
        HELP_DESK,
        Some(&json!({"fieldData": {"contactName": "Help Desk"}})),
    );
    let (after, body) = http(port, "GET", "/reports/MCPAR/AB/mock-report-id", HELP_DESK, None);
    stop_server(child);

    assert_eq!(read, 200);
    assert_eq!(write, 403);
    assert_eq!(after, 200);
    assert_eq!(
        json_body(&body)["fieldData"]["contactName"],
        "Thelonious States"
    );
}

#[test]
fn create_then_fetch_new_report() {
    let port = next_port();
    let child = start_server(port);

    let (created_status, created_body) = http(
        port,
        "POST",
        "/reports/MCPAR/AB",
        STATE_USER,
        Some(&json!({
            "formTemplateId": "mcpar-template-v1",
            "metadata": {"programName": "New Program", "dueDate": "2026-12-31"},
            "fieldData": {"contactName": "Thelonious States"}
        })),
    );
    let created = json_body(&created_body);
    let id = created["id"].as_str().unwrap_or_default().to_string();
    let (fetched_status, fetched_body) = http(
        port,
        "GET",
        &format!("/reports/MCPAR/AB/{id}"),
        STATE_USER,
        None,
    );
    stop_server(child);

    assert_eq!(created_status, 201);
    assert_eq!(created["status"], "Not started");
    assert_eq!(created["isComplete"], false);
    assert_eq!(created["completionStatus"], json!({"step-one": false}));
    assert_eq!(fetched_status, 200);
    assert_eq!(json_body(&fetched_body)["programName"], "New Program");
}

#[test]
fn mlr_submit_locks_until_admin_release() {
    let port = next_port();
    let child = start_server(port);
    let key = "MLR/AB/mock-mlr-id";

    let (submitted_status, submitted_body) = http(
        port,
        "POST",
        &format!("/reports/submit/{key}"),
        STATE_USER,
        None,
    );
    let (locked_write, _) = http(
        port,
        "PUT",
        &format!("/reports/{key}"),
        STATE_USER,
        Some(&json!({"fieldData": {"contactName": "late edit"}})),
    );
    let (user_release, _) = http(
        port,
        "PUT",
        &format!("/reports/release/{key}"),
        STATE_USER,
        None,
    );
    let (admin_release, released_body) = http(
        port,
        "PUT",
        &format!("/reports/release/{key}"),
        ADMIN,
        None,
    );
    stop_server(child);

    assert_eq!(submitted_status, 200);
    let submitted = json_body(&submitted_body);
    assert_eq!(submitted["status"], "Submitted");
    assert_eq!(submitted["locked"], true);
    assert_eq!(submitted["submissionCount"], 1);
    assert_eq!(submitted["previousRevisions"].as_array().map(Vec::len), Some(1));

    assert_eq!(locked_write, 403);
    assert_eq!(user_release, 403);
    assert_eq!(admin_release, 200);
    let released = json_body(&released_body);
    assert_eq!(released["locked"], false);
    assert_eq!(released["status"], "In progress");
}

#[test]
fn unmatched_route_is_404_json() {
    let port = next_port();
    let child = start_server(port);

    let (status, body) = http(port, "GET", "/nope", &[], None);
    stop_server(child);

    assert_eq!(status, 404);
    assert_eq!(json_body(&body)["error"], "not found");
}
