use crate::model::{AttendanceDraft, AttendanceRecord, AttendanceStatus, Entity};
use crate::store::{AttendanceLog, Repository, StoreError};

/// Vec-backed repository used for ephemeral workspaces and as the test
/// double. `next_id` is a high-water mark, so deleting the newest record
/// never frees its id for reuse.
pub struct MemoryStore<T> {
    records: Vec<T>,
    next_id: i64,
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Repository<T> for MemoryStore<T> {
    fn get_all(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.records.clone())
    }

    fn get_by_id(&self, id: i64) -> Result<T, StoreError> {
        self.records
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found::<T>(id))
    }

    fn create(&mut self, draft: T::Draft) -> Result<T, StoreError> {
        let id = self.next_id;
        self.next_id += 1;
        let record = T::assemble(id, draft);
        self.records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, id: i64, patch: T::Patch) -> Result<T, StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found::<T>(id))?;
        record.merge(patch);
        Ok(record.clone())
    }

    fn delete(&mut self, id: i64) -> Result<T, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| StoreError::not_found::<T>(id))?;
        Ok(self.records.remove(index))
    }
}

impl AttendanceLog for MemoryStore<AttendanceRecord> {
    fn mark(
        &mut self,
        student_id: i64,
        date: &str,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, StoreError> {
        // No suspension point between this lookup and the write below, so the
        // (studentId, date) key cannot gain a duplicate.
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.student_id == student_id && r.date == date)
        {
            existing.status = status;
            existing.notes = notes;
            return Ok(existing.clone());
        }
        self.create(AttendanceDraft {
            student_id,
            date: date.to_string(),
            status,
            notes,
        })
    }
}
