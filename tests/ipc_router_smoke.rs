use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_scholarhubd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn scholarhubd");
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
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

fn sample_student(first: &str, email: &str) -> serde_json::Value {
    json!({
        "firstName": first,
        "lastName": "Rivera",
        "dateOfBirth": "2012-03-14",
        "grade": "6th Grade",
        "enrollmentDate": "2023-09-05",
        "email": email,
        "phone": "555-0100",
        "address": "12 Elm St",
        "guardianName": "Pat Rivera",
        "guardianPhone": "555-0101",
        "emergencyContactName": "Sam Rivera",
        "emergencyContactPhone": "555-0102",
        "emergencyContactRelationship": "Uncle",
        "status": "active"
    })
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("scholarhub-router-smoke");
    let bundle_out = workspace.join("smoke-backup.shbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request(&mut stdin, &mut reader, "1", "health", json!({}));
    let selected = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["ok"], json!(true));
    assert_eq!(selected["result"]["backend"], json!("sqlite"));

    let created = request(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        sample_student("Noa", "noa@example.com"),
    );
    let student_id = created["result"]["student"]["id"]
        .as_i64()
        .expect("student id");

    let _ = request(&mut stdin, &mut reader, "4", "students.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "5",
        "students.search",
        json!({ "query": "noa" }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "6",
        "parents.create",
        json!({
            "firstName": "Pat",
            "lastName": "Rivera",
            "email": "pat@example.com",
            "phone": "555-0101",
            "relationship": "father",
            "studentIds": [student_id],
            "isPrimary": true,
            "emergencyContact": true
        }),
    );
    let _ = request(&mut stdin, &mut reader, "7", "parents.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "8",
        "parents.byStudent",
        json!({ "studentId": student_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "9",
        "grades.create",
        json!({
            "studentId": student_id,
            "subject": "Mathematics",
            "score": 92,
            "maxScore": 100,
            "term": "First Quarter",
            "date": "2025-10-03"
        }),
    );
    let _ = request(&mut stdin, &mut reader, "10", "grades.list", json!({}));
    let _ = request(&mut stdin, &mut reader, "11", "grades.stats", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "12",
        "attendance.mark",
        json!({
            "studentId": student_id,
            "date": "2025-09-08",
            "status": "present"
        }),
    );
    let _ = request(&mut stdin, &mut reader, "13", "attendance.list", json!({}));
    let _ = request(
        &mut stdin,
        &mut reader,
        "14",
        "attendance.stats",
        json!({}),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "15",
        "communications.create",
        json!({
            "parentId": 1,
            "teacherId": 1,
            "studentIds": [student_id],
            "type": "meeting",
            "subject": "Fall check-in",
            "notes": "Discussed progress"
        }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "16",
        "communications.list",
        json!({}),
    );
    let overview = request(&mut stdin, &mut reader, "17", "reports.overview", json!({}));
    assert_eq!(overview["ok"], json!(true));
    assert_eq!(overview["result"]["totals"]["students"], json!(1));

    let exported = request(
        &mut stdin,
        &mut reader,
        "18",
        "backup.export",
        json!({ "outPath": bundle_out.to_string_lossy() }),
    );
    assert_eq!(exported["ok"], json!(true));
    let _ = request(
        &mut stdin,
        &mut reader,
        "19",
        "students.delete",
        json!({ "id": student_id }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unknown_methods_report_not_implemented() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let payload = json!({ "id": "1", "method": "nope.nothing", "params": {} });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("not_implemented"));

    drop(stdin);
    let _ = child.wait();
}
