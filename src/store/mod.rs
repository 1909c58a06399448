pub mod memory;
pub mod sqlite;

use std::path::Path;
use std::rc::Rc;

use crate::model::{
    AttendanceRecord, AttendanceStatus, Communication, Entity, Grade, Parent, Student,
};

#[derive(Debug)]
pub enum StoreError {
    NotFound { kind: &'static str, id: i64 },
    Backend(String),
}

impl StoreError {
    pub fn not_found<T: Entity>(id: i64) -> Self {
        StoreError::NotFound { kind: T::KIND, id }
    }

    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "not_found",
            StoreError::Backend(_) => "db_query_failed",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound { kind, id } => write!(f, "{} {} not found", kind, id),
            StoreError::Backend(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for StoreError {}

/// Uniform CRUD contract every entity collection satisfies.
///
/// Ids start at 1, increase monotonically, and are never reused after a
/// delete. `get_all` hands out a defensive copy in ascending id order;
/// callers may reorder or drop it freely without touching the collection.
pub trait Repository<T: Entity> {
    fn get_all(&self) -> Result<Vec<T>, StoreError>;
    fn get_by_id(&self, id: i64) -> Result<T, StoreError>;
    fn create(&mut self, draft: T::Draft) -> Result<T, StoreError>;
    fn update(&mut self, id: i64, patch: T::Patch) -> Result<T, StoreError>;
    fn delete(&mut self, id: i64) -> Result<T, StoreError>;
}

/// Attendance adds the marking workflow on top of plain CRUD: at most one
/// record per (studentId, date), created on first mark and updated in place
/// afterwards.
pub trait AttendanceLog: Repository<AttendanceRecord> {
    fn mark(
        &mut self,
        student_id: i64,
        date: &str,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, StoreError>;
}

/// One open workspace: the five entity collections behind their repository
/// traits. The backend is chosen at `workspace.select` time; handlers and
/// aggregators never see which one they got.
pub struct SchoolStore {
    pub students: Box<dyn Repository<Student>>,
    pub parents: Box<dyn Repository<Parent>>,
    pub grades: Box<dyn Repository<Grade>>,
    pub attendance: Box<dyn AttendanceLog>,
    pub communications: Box<dyn Repository<Communication>>,
}

impl SchoolStore {
    /// Ephemeral in-memory workspace; contents die with the process.
    pub fn ephemeral() -> Self {
        SchoolStore {
            students: Box::new(memory::MemoryStore::new()),
            parents: Box::new(memory::MemoryStore::new()),
            grades: Box::new(memory::MemoryStore::new()),
            attendance: Box::new(memory::MemoryStore::new()),
            communications: Box::new(memory::MemoryStore::new()),
        }
    }

    /// Durable workspace backed by a SQLite file under `workspace`.
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = Rc::new(sqlite::open_db(workspace)?);
        Ok(SchoolStore {
            students: Box::new(sqlite::SqliteStore::new(Rc::clone(&conn))),
            parents: Box::new(sqlite::SqliteStore::new(Rc::clone(&conn))),
            grades: Box::new(sqlite::SqliteStore::new(Rc::clone(&conn))),
            attendance: Box::new(sqlite::SqliteStore::new(Rc::clone(&conn))),
            communications: Box::new(sqlite::SqliteStore::new(conn)),
        })
    }
}
