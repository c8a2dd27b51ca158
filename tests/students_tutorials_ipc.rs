use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_tutord");
    let mut child = Command::new(exe)
        .env_remove("TUTORD_CONFIG")
        .env("TUTORD_WEEKS", "13")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn tutord");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "expected failure: {}", value);
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
}

fn names(list: &serde_json::Value) -> Vec<String> {
    list.as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect()
}

#[test]
fn unknown_tutorials_are_dropped_and_attendance_created() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "1", "tutorials.create", json!({ "name": "CS101" }));
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({
            "name": "Alice",
            "studentNo": "A1",
            "email": "alice@uni.edu",
            "tutorials": ["CS101", "CS999"]
        }),
    );
    assert_eq!(created.get("droppedTutorials").and_then(|v| v.as_u64()), Some(1));
    let student = created.get("student").cloned().expect("student");
    assert_eq!(names(&student["tutorials"]), vec!["CS101"]);

    let sheet = request_ok(&mut stdin, &mut reader, "3", "attendance.get", json!({ "tutorial": "CS101" }));
    let rows = sheet.get("rows").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(rows.len(), 1);
    let weeks = rows[0].get("weeks").and_then(|v| v.as_array()).cloned().unwrap_or_default();
    assert_eq!(weeks.len(), 13);
    assert!(weeks.iter().all(|w| w.as_bool() == Some(false)));

    // Removing the tutorial strips it from the student and drops the attendance.
    let _ = request_ok(&mut stdin, &mut reader, "4", "tutorials.delete", json!({ "tutorial": "CS101" }));
    let got = request_ok(&mut stdin, &mut reader, "5", "students.get", json!({ "student": "A1" }));
    assert!(names(&got["student"]["tutorials"]).is_empty());
    let gone = request(&mut stdin, &mut reader, "6", "attendance.get", json!({ "tutorial": "CS101" }));
    assert_eq!(error_code(&gone), "not_found");
    let _ = request_ok(&mut stdin, &mut reader, "7", "store.verify", json!({}));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn duplicate_students_are_rejected_on_any_identity_field() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "Alice", "studentNo": "A1", "handle": "@alice" }),
    );
    let dup = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "Alicia", "studentNo": "A2", "handle": "@alice" }),
    );
    assert_eq!(error_code(&dup), "duplicate");

    let bob = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "name": "Bob", "studentNo": "B1" }),
    );
    let bob_id = bob.get("studentId").and_then(|v| v.as_str()).expect("bob id").to_string();
    let clash = request(
        &mut stdin,
        &mut reader,
        "4",
        "students.update",
        json!({ "studentId": bob_id, "patch": { "studentNo": "A1" } }),
    );
    assert_eq!(error_code(&clash), "duplicate");

    let list = request_ok(&mut stdin, &mut reader, "5", "students.list", json!({}));
    assert_eq!(list["students"].as_array().map(|a| a.len()), Some(2));
    let found = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "keywords": ["ali"] }),
    );
    assert_eq!(found["students"][0]["name"], "Alice");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn roster_lists_enrolled_students_sorted() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "1", "tutorials.create", json!({ "name": "T01" }));
    for (i, (name, no)) in [("Zed", "Z1"), ("Amy", "A1"), ("Kim", "K1")].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "name": name, "studentNo": no, "tutorials": ["T01"] }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "u",
        "tutorials.unenroll",
        json!({ "tutorial": "T01", "student": "K1" }),
    );

    let roster = request_ok(&mut stdin, &mut reader, "r", "tutorials.roster", json!({ "tutorial": "T01" }));
    let listed: Vec<String> = roster["students"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s.get("name").and_then(|v| v.as_str()).map(|v| v.to_string()))
        .collect();
    assert_eq!(listed, vec!["Amy", "Zed"]);

    let sheet = request_ok(&mut stdin, &mut reader, "a", "attendance.get", json!({ "tutorial": "T01" }));
    assert_eq!(sheet["rows"].as_array().map(|a| a.len()), Some(2));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn ambiguous_student_key_is_rejected_with_candidates() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(&mut stdin, &mut reader, "t", "tutorials.create", json!({ "name": "CS101" }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "Alice", "studentNo": "A1", "handle": "Bob", "tutorials": ["CS101"] }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "Bob", "studentNo": "B1", "tutorials": ["CS101"] }),
    );

    let res = request(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.set",
        json!({ "tutorial": "CS101", "student": "Bob", "week": 1, "present": true }),
    );
    assert_eq!(error_code(&res), "bad_params");
    assert_eq!(res["error"]["details"]["candidates"], json!(["A1", "B1"]));

    let got = request_ok(&mut stdin, &mut reader, "4", "students.get", json!({ "student": "B1" }));
    assert_eq!(got["student"]["name"], "Bob");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn student_lookup_failures_map_to_codes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "Alice", "studentNo": "A1" }),
    );
    let alice = created["studentId"].as_str().expect("studentId").to_string();

    let missing = request(
        &mut stdin,
        &mut reader,
        "2",
        "students.get",
        json!({ "studentId": "00000000-0000-4000-8000-000000000000" }),
    );
    assert_eq!(error_code(&missing), "not_found");

    let bad_id = request(&mut stdin, &mut reader, "3", "students.get", json!({ "studentId": "A1" }));
    assert_eq!(error_code(&bad_id), "bad_params");

    let no_patch = request(&mut stdin, &mut reader, "4", "students.update", json!({ "studentId": alice }));
    assert_eq!(error_code(&no_patch), "bad_params");

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "studentId": alice, "patch": { "email": "alice@uni.edu" } }),
    );
    assert_eq!(updated["student"]["email"], "alice@uni.edu");
    assert_eq!(updated["student"]["studentNo"], "A1");

    let gone = request(&mut stdin, &mut reader, "6", "students.update", json!({ "student": "Nobody", "patch": {} }));
    assert_eq!(error_code(&gone), "not_found");

    drop(stdin);
    let _ = child.wait();
}
