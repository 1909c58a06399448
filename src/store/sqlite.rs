use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::marker::PhantomData;
use std::path::Path;
use std::rc::Rc;

use crate::model::{
    AttendanceRecord, AttendanceStatus, Communication, CommunicationType, Entity, Grade,
    GradeLevel, Parent, Relationship, Student, StudentStatus, Term,
};
use crate::store::{AttendanceLog, Repository, StoreError};

pub const DB_FILE: &str = "scholarhub.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;

    // AUTOINCREMENT retires deleted ids instead of recycling rowids.
    // References between entities are deliberately weak: no FOREIGN KEY
    // clauses, no cascade on delete.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            grade TEXT NOT NULL,
            enrollment_date TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT NOT NULL,
            guardian_name TEXT NOT NULL,
            guardian_phone TEXT NOT NULL,
            guardian_email TEXT,
            emergency_contact_name TEXT NOT NULL,
            emergency_contact_phone TEXT NOT NULL,
            emergency_contact_relationship TEXT NOT NULL,
            status TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_status ON students(status)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS parents(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            address TEXT,
            relationship TEXT NOT NULL,
            occupation TEXT,
            work_phone TEXT,
            student_ids TEXT NOT NULL,
            is_primary INTEGER NOT NULL,
            emergency_contact INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            subject TEXT NOT NULL,
            score REAL NOT NULL,
            max_score REAL NOT NULL,
            term TEXT NOT NULL,
            date TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grades_subject ON grades(subject)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT,
            UNIQUE(student_id, date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS communications(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER NOT NULL,
            teacher_id INTEGER NOT NULL,
            student_ids TEXT NOT NULL,
            type TEXT NOT NULL,
            subject TEXT NOT NULL,
            notes TEXT NOT NULL,
            follow_up_required INTEGER NOT NULL,
            follow_up_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_communications_parent ON communications(parent_id)",
        [],
    )?;

    Ok(conn)
}

/// Row mapping each entity supplies so the generic store can build its SQL.
/// `from_row` reads id at index 0 and `COLUMNS` in order after it; `bind`
/// yields one value per column, id excluded.
pub trait SqlRecord: Entity {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>
    where
        Self: Sized;
    fn bind(&self) -> Vec<Value>;
}

fn backend_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn bad_cell(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn enum_cell<T>(
    row: &Row<'_>,
    index: usize,
    parse: fn(&str) -> Option<T>,
    what: &str,
) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    parse(&raw).ok_or_else(|| bad_cell(index, format!("unrecognized {}: {}", what, raw)))
}

fn ids_cell(row: &Row<'_>, index: usize) -> rusqlite::Result<Vec<i64>> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn ids_value(ids: &[i64]) -> Value {
    Value::Text(serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string()))
}

impl SqlRecord for Student {
    const TABLE: &'static str = "students";
    const COLUMNS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "date_of_birth",
        "grade",
        "enrollment_date",
        "email",
        "phone",
        "address",
        "guardian_name",
        "guardian_phone",
        "guardian_email",
        "emergency_contact_name",
        "emergency_contact_phone",
        "emergency_contact_relationship",
        "status",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Student {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            date_of_birth: row.get(3)?,
            grade: enum_cell(row, 4, GradeLevel::parse, "grade level")?,
            enrollment_date: row.get(5)?,
            email: row.get(6)?,
            phone: row.get(7)?,
            address: row.get(8)?,
            guardian_name: row.get(9)?,
            guardian_phone: row.get(10)?,
            guardian_email: row.get(11)?,
            emergency_contact_name: row.get(12)?,
            emergency_contact_phone: row.get(13)?,
            emergency_contact_relationship: row.get(14)?,
            status: enum_cell(row, 15, StudentStatus::parse, "student status")?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.date_of_birth.clone().into(),
            self.grade.label().to_string().into(),
            self.enrollment_date.clone().into(),
            self.email.clone().into(),
            self.phone.clone().into(),
            self.address.clone().into(),
            self.guardian_name.clone().into(),
            self.guardian_phone.clone().into(),
            self.guardian_email.clone().into(),
            self.emergency_contact_name.clone().into(),
            self.emergency_contact_phone.clone().into(),
            self.emergency_contact_relationship.clone().into(),
            self.status.as_str().to_string().into(),
        ]
    }
}

impl SqlRecord for Parent {
    const TABLE: &'static str = "parents";
    const COLUMNS: &'static [&'static str] = &[
        "first_name",
        "last_name",
        "email",
        "phone",
        "address",
        "relationship",
        "occupation",
        "work_phone",
        "student_ids",
        "is_primary",
        "emergency_contact",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Parent {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            address: row.get(5)?,
            relationship: enum_cell(row, 6, Relationship::parse, "relationship")?,
            occupation: row.get(7)?,
            work_phone: row.get(8)?,
            student_ids: ids_cell(row, 9)?,
            is_primary: row.get(10)?,
            emergency_contact: row.get(11)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            self.first_name.clone().into(),
            self.last_name.clone().into(),
            self.email.clone().into(),
            self.phone.clone().into(),
            self.address.clone().into(),
            self.relationship.as_str().to_string().into(),
            self.occupation.clone().into(),
            self.work_phone.clone().into(),
            ids_value(&self.student_ids),
            self.is_primary.into(),
            self.emergency_contact.into(),
        ]
    }
}

impl SqlRecord for Grade {
    const TABLE: &'static str = "grades";
    const COLUMNS: &'static [&'static str] = &[
        "student_id",
        "subject",
        "score",
        "max_score",
        "term",
        "date",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Grade {
            id: row.get(0)?,
            student_id: row.get(1)?,
            subject: row.get(2)?,
            score: row.get(3)?,
            max_score: row.get(4)?,
            term: enum_cell(row, 5, Term::parse, "term")?,
            date: row.get(6)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            self.student_id.into(),
            self.subject.clone().into(),
            self.score.into(),
            self.max_score.into(),
            self.term.label().to_string().into(),
            self.date.clone().into(),
        ]
    }
}

impl SqlRecord for AttendanceRecord {
    const TABLE: &'static str = "attendance";
    const COLUMNS: &'static [&'static str] = &["student_id", "date", "status", "notes"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AttendanceRecord {
            id: row.get(0)?,
            student_id: row.get(1)?,
            date: row.get(2)?,
            status: enum_cell(row, 3, AttendanceStatus::parse, "attendance status")?,
            notes: row.get(4)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            self.student_id.into(),
            self.date.clone().into(),
            self.status.as_str().to_string().into(),
            self.notes.clone().into(),
        ]
    }
}

impl SqlRecord for Communication {
    const TABLE: &'static str = "communications";
    const COLUMNS: &'static [&'static str] = &[
        "parent_id",
        "teacher_id",
        "student_ids",
        "type",
        "subject",
        "notes",
        "follow_up_required",
        "follow_up_date",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Communication {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            teacher_id: row.get(2)?,
            student_ids: ids_cell(row, 3)?,
            kind: enum_cell(row, 4, CommunicationType::parse, "communication type")?,
            subject: row.get(5)?,
            notes: row.get(6)?,
            follow_up_required: row.get(7)?,
            follow_up_date: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn bind(&self) -> Vec<Value> {
        vec![
            self.parent_id.into(),
            self.teacher_id.into(),
            ids_value(&self.student_ids),
            self.kind.as_str().to_string().into(),
            self.subject.clone().into(),
            self.notes.clone().into(),
            self.follow_up_required.into(),
            self.follow_up_date.clone().into(),
            self.created_at.clone().into(),
            self.updated_at.clone().into(),
        ]
    }
}

/// Durable repository over one shared connection. The SQL is assembled from
/// each entity's `SqlRecord` mapping; semantics match `MemoryStore` exactly.
pub struct SqliteStore<T> {
    conn: Rc<Connection>,
    _entity: PhantomData<T>,
}

impl<T> SqliteStore<T> {
    pub fn new(conn: Rc<Connection>) -> Self {
        SqliteStore {
            conn,
            _entity: PhantomData,
        }
    }
}

impl<T: SqlRecord> SqliteStore<T> {
    fn select_sql(suffix: &str) -> String {
        format!(
            "SELECT id, {} FROM {} {}",
            T::COLUMNS.join(", "),
            T::TABLE,
            suffix
        )
    }
}

impl<T: SqlRecord> Repository<T> for SqliteStore<T> {
    fn get_all(&self) -> Result<Vec<T>, StoreError> {
        let sql = Self::select_sql("ORDER BY id");
        let mut stmt = self.conn.prepare(&sql).map_err(backend_err)?;
        let rows = stmt
            .query_map([], |row| T::from_row(row))
            .map_err(backend_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(backend_err)
    }

    fn get_by_id(&self, id: i64) -> Result<T, StoreError> {
        let sql = Self::select_sql("WHERE id = ?");
        self.conn
            .query_row(&sql, [id], |row| T::from_row(row))
            .optional()
            .map_err(backend_err)?
            .ok_or_else(|| StoreError::not_found::<T>(id))
    }

    fn create(&mut self, draft: T::Draft) -> Result<T, StoreError> {
        let staged = T::assemble(0, draft);
        let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {}({}) VALUES({})",
            T::TABLE,
            T::COLUMNS.join(", "),
            placeholders
        );
        self.conn
            .execute(&sql, params_from_iter(staged.bind()))
            .map_err(backend_err)?;
        self.get_by_id(self.conn.last_insert_rowid())
    }

    fn update(&mut self, id: i64, patch: T::Patch) -> Result<T, StoreError> {
        let mut record = self.get_by_id(id)?;
        record.merge(patch);
        let assignments = T::COLUMNS
            .iter()
            .map(|c| format!("{} = ?", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE id = ?", T::TABLE, assignments);
        let mut values = record.bind();
        values.push(Value::Integer(id));
        self.conn
            .execute(&sql, params_from_iter(values))
            .map_err(backend_err)?;
        Ok(record)
    }

    fn delete(&mut self, id: i64) -> Result<T, StoreError> {
        let record = self.get_by_id(id)?;
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        self.conn.execute(&sql, [id]).map_err(backend_err)?;
        Ok(record)
    }
}

impl AttendanceLog for SqliteStore<AttendanceRecord> {
    fn mark(
        &mut self,
        student_id: i64,
        date: &str,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, StoreError> {
        // The unique (student_id, date) index turns a concurrent second mark
        // into an update of the same row rather than a duplicate.
        self.conn
            .execute(
                "INSERT INTO attendance(student_id, date, status, notes)
                 VALUES(?, ?, ?, ?)
                 ON CONFLICT(student_id, date) DO UPDATE SET
                   status = excluded.status,
                   notes = excluded.notes",
                params![student_id, date, status.as_str(), notes],
            )
            .map_err(backend_err)?;
        self.conn
            .query_row(
                "SELECT id, student_id, date, status, notes
                 FROM attendance
                 WHERE student_id = ? AND date = ?",
                params![student_id, date],
                |row| AttendanceRecord::from_row(row),
            )
            .map_err(backend_err)
    }
}
