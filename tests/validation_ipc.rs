use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

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
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn select_ephemeral(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let selected = request(
        stdin,
        reader,
        "select",
        "workspace.select",
        json!({ "ephemeral": true }),
    );
    assert_eq!(selected["ok"], json!(true));
}

fn valid_student(first: &str) -> serde_json::Value {
    json!({
        "firstName": first,
        "lastName": "Quinn",
        "dateOfBirth": "2012-02-02",
        "grade": "6th Grade",
        "enrollmentDate": "2023-09-05",
        "email": format!("{}@example.com", first.to_lowercase()),
        "phone": "555-0160",
        "guardianName": "Ash Quinn",
        "guardianPhone": "555-0161",
        "emergencyContactName": "Bo Quinn",
        "emergencyContactPhone": "555-0162",
        "emergencyContactRelationship": "Father"
    })
}

#[test]
fn missing_student_fields_are_reported_per_field() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_ephemeral(&mut stdin, &mut reader);

    let created = request(
        &mut stdin,
        &mut reader,
        "create",
        "students.create",
        json!({ "firstName": "Solo" }),
    );
    assert_eq!(created["ok"], json!(false));
    assert_eq!(created["error"]["code"], json!("validation_failed"));
    let fields = &created["error"]["details"]["fields"];
    assert_eq!(fields["lastName"], json!("Last name is required"));
    assert_eq!(fields["email"], json!("Email is required"));
    assert_eq!(fields["grade"], json!("Grade is required"));
    assert!(fields.get("firstName").is_none());

    // Nothing was persisted.
    let listed = request(&mut stdin, &mut reader, "list", "students.list", json!({}));
    assert!(listed["result"]["students"]
        .as_array()
        .expect("students")
        .is_empty());

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn malformed_values_fail_with_inline_messages() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_ephemeral(&mut stdin, &mut reader);

    let mut params = valid_student("Mira");
    params["email"] = json!("not-an-email");
    params["dateOfBirth"] = json!("02/02/2012");
    params["grade"] = json!("13th Grade");
    let created = request(&mut stdin, &mut reader, "create", "students.create", params);

    assert_eq!(created["error"]["code"], json!("validation_failed"));
    let fields = &created["error"]["details"]["fields"];
    assert_eq!(fields["email"], json!("Please enter a valid email address"));
    assert_eq!(
        fields["dateOfBirth"],
        json!("Date of birth must be a valid YYYY-MM-DD date")
    );
    assert_eq!(
        fields["grade"],
        json!("Grade must be one of the school's grade levels")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn update_validates_only_the_present_fields() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_ephemeral(&mut stdin, &mut reader);

    let created = request(
        &mut stdin,
        &mut reader,
        "create",
        "students.create",
        valid_student("Nils"),
    );
    let id = created["result"]["student"]["id"].as_i64().expect("id");

    // Absent fields pass; a present-but-broken one still fails.
    let good = request(
        &mut stdin,
        &mut reader,
        "good",
        "students.update",
        json!({ "id": id, "address": "44 Oak Ave" }),
    );
    assert_eq!(good["ok"], json!(true));
    assert_eq!(good["result"]["student"]["address"], json!("44 Oak Ave"));

    let bad = request(
        &mut stdin,
        &mut reader,
        "bad",
        "students.update",
        json!({ "id": id, "email": "broken" }),
    );
    assert_eq!(bad["error"]["code"], json!("validation_failed"));
    assert_eq!(
        bad["error"]["details"]["fields"]["email"],
        json!("Please enter a valid email address")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn grade_rules_cover_scores_and_cross_checks() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_ephemeral(&mut stdin, &mut reader);

    let created = request(
        &mut stdin,
        &mut reader,
        "student",
        "students.create",
        valid_student("Orla"),
    );
    let student = created["result"]["student"]["id"].as_i64().expect("id");

    let over = request(
        &mut stdin,
        &mut reader,
        "over",
        "grades.create",
        json!({
            "studentId": student,
            "subject": "Physics",
            "score": 110,
            "maxScore": 100,
            "term": "First Quarter",
            "date": "2025-10-03"
        }),
    );
    assert_eq!(over["error"]["code"], json!("validation_failed"));
    assert_eq!(
        over["error"]["details"]["fields"]["score"],
        json!("Score cannot exceed maximum score")
    );

    let zero_max = request(
        &mut stdin,
        &mut reader,
        "zero-max",
        "grades.create",
        json!({
            "studentId": student,
            "subject": "Physics",
            "score": 0,
            "maxScore": 0,
            "term": "First Quarter",
            "date": "2025-10-03"
        }),
    );
    assert_eq!(
        zero_max["error"]["details"]["fields"]["maxScore"],
        json!("Maximum score must be a positive number")
    );

    let orphan = request(
        &mut stdin,
        &mut reader,
        "orphan",
        "grades.create",
        json!({
            "studentId": 99,
            "subject": "Physics",
            "score": 50,
            "maxScore": 100,
            "term": "First Quarter",
            "date": "2025-10-03"
        }),
    );
    assert_eq!(
        orphan["error"]["details"]["fields"]["studentId"],
        json!("Student 99 does not exist")
    );

    // A legal grade goes through, then patching score past the stored
    // maximum is rejected against the merged record.
    let ok = request(
        &mut stdin,
        &mut reader,
        "ok",
        "grades.create",
        json!({
            "studentId": student,
            "subject": "Physics",
            "score": 40,
            "maxScore": 50,
            "term": "First Quarter",
            "date": "2025-10-03"
        }),
    );
    assert_eq!(ok["ok"], json!(true));
    let grade_id = ok["result"]["grade"]["id"].as_i64().expect("grade id");

    let patched = request(
        &mut stdin,
        &mut reader,
        "patch",
        "grades.update",
        json!({ "id": grade_id, "score": 60 }),
    );
    assert_eq!(patched["error"]["code"], json!("validation_failed"));
    assert_eq!(
        patched["error"]["details"]["fields"]["score"],
        json!("Score cannot exceed maximum score")
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn parent_links_are_checked_at_the_form_boundary() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_ephemeral(&mut stdin, &mut reader);

    let no_students = request(
        &mut stdin,
        &mut reader,
        "no-students",
        "parents.create",
        json!({
            "firstName": "Remy",
            "lastName": "Faure",
            "email": "remy@example.com",
            "phone": "555-0170",
            "relationship": "father",
            "studentIds": []
        }),
    );
    assert_eq!(no_students["error"]["code"], json!("validation_failed"));
    assert_eq!(
        no_students["error"]["details"]["fields"]["studentIds"],
        json!("At least one student must be linked")
    );

    let dangling = request(
        &mut stdin,
        &mut reader,
        "dangling",
        "parents.create",
        json!({
            "firstName": "Remy",
            "lastName": "Faure",
            "email": "remy@example.com",
            "phone": "555-0170",
            "relationship": "father",
            "studentIds": [12]
        }),
    );
    assert_eq!(
        dangling["error"]["details"]["fields"]["studentIds"],
        json!("Student 12 does not exist")
    );

    // Once the link target exists the create passes, and deleting the
    // student afterwards leaves the stored reference dangling by design.
    let created = request(
        &mut stdin,
        &mut reader,
        "student",
        "students.create",
        valid_student("Pia"),
    );
    let student = created["result"]["student"]["id"].as_i64().expect("id");
    let parent = request(
        &mut stdin,
        &mut reader,
        "parent",
        "parents.create",
        json!({
            "firstName": "Remy",
            "lastName": "Faure",
            "email": "remy@example.com",
            "phone": "555-0170",
            "relationship": "father",
            "studentIds": [student]
        }),
    );
    assert_eq!(parent["ok"], json!(true));

    let _ = request(
        &mut stdin,
        &mut reader,
        "delete",
        "students.delete",
        json!({ "id": student }),
    );
    let listed = request(&mut stdin, &mut reader, "parents", "parents.list", json!({}));
    let parents = listed["result"]["parents"].as_array().expect("parents");
    assert_eq!(parents[0]["studentIds"], json!([student]));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn follow_up_date_is_required_when_flagged() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    select_ephemeral(&mut stdin, &mut reader);

    let created = request(
        &mut stdin,
        &mut reader,
        "student",
        "students.create",
        valid_student("Suvi"),
    );
    let student = created["result"]["student"]["id"].as_i64().expect("id");
    let parent = request(
        &mut stdin,
        &mut reader,
        "parent",
        "parents.create",
        json!({
            "firstName": "Kai",
            "lastName": "Virtanen",
            "email": "kai@example.com",
            "phone": "555-0180",
            "relationship": "guardian",
            "studentIds": [student]
        }),
    );
    let parent_id = parent["result"]["parent"]["id"].as_i64().expect("id");

    let missing_date = request(
        &mut stdin,
        &mut reader,
        "missing-date",
        "communications.create",
        json!({
            "parentId": parent_id,
            "teacherId": 1,
            "studentIds": [student],
            "type": "phone",
            "subject": "Reading progress",
            "notes": "Needs weekly check-in",
            "followUpRequired": true
        }),
    );
    assert_eq!(missing_date["error"]["code"], json!("validation_failed"));
    assert_eq!(
        missing_date["error"]["details"]["fields"]["followUpDate"],
        json!("Follow-up date is required when follow-up is needed")
    );

    let with_date = request(
        &mut stdin,
        &mut reader,
        "with-date",
        "communications.create",
        json!({
            "parentId": parent_id,
            "teacherId": 1,
            "studentIds": [student],
            "type": "phone",
            "subject": "Reading progress",
            "notes": "Needs weekly check-in",
            "followUpRequired": true,
            "followUpDate": "2025-11-01"
        }),
    );
    assert_eq!(with_date["ok"], json!(true), "create failed: {}", with_date);
    let comm = &with_date["result"]["communication"];
    let comm_id = comm["id"].as_i64().expect("id");
    assert!(comm["createdAt"].as_str().expect("createdAt").len() >= 20);
    assert_eq!(comm["createdAt"], comm["updatedAt"]);

    // Flipping the flag off on update clears the stored date.
    let cleared = request(
        &mut stdin,
        &mut reader,
        "cleared",
        "communications.update",
        json!({ "id": comm_id, "followUpRequired": false }),
    );
    assert_eq!(cleared["ok"], json!(true));
    assert_eq!(
        cleared["result"]["communication"]["followUpRequired"],
        json!(false)
    );
    assert!(cleared["result"]["communication"]
        .get("followUpDate")
        .is_none());

    let outsider = request(
        &mut stdin,
        &mut reader,
        "outsider",
        "communications.create",
        json!({
            "parentId": parent_id,
            "teacherId": 1,
            "studentIds": [987],
            "type": "email",
            "subject": "Misfiled",
            "notes": "Wrong student",
        }),
    );
    assert_eq!(outsider["error"]["code"], json!("validation_failed"));
    assert_eq!(
        outsider["error"]["details"]["fields"]["studentIds"],
        json!("Student 987 is not linked to this parent")
    );

    drop(stdin);
    let _ = child.wait();
}
