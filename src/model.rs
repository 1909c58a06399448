use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A stored record with a repository-assigned integer id.
///
/// `Draft` is the record minus its id (what `create` accepts); `Patch` is the
/// partial form (what `update` accepts). `merge` is a shallow merge: fields
/// absent from the patch keep their stored values.
pub trait Entity: Clone {
    type Draft;
    type Patch;

    const KIND: &'static str;

    fn id(&self) -> i64;
    fn assemble(id: i64, draft: Self::Draft) -> Self;
    fn merge(&mut self, patch: Self::Patch);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
            StudentStatus::Graduated => "graduated",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(StudentStatus::Active),
            "inactive" => Some(StudentStatus::Inactive),
            "graduated" => Some(StudentStatus::Graduated),
            _ => None,
        }
    }
}

/// The 13 enrollment levels, Kindergarten through 12th Grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeLevel {
    Kindergarten,
    First,
    Second,
    Third,
    Fourth,
    Fifth,
    Sixth,
    Seventh,
    Eighth,
    Ninth,
    Tenth,
    Eleventh,
    Twelfth,
}

impl GradeLevel {
    pub fn label(self) -> &'static str {
        match self {
            GradeLevel::Kindergarten => "Kindergarten",
            GradeLevel::First => "1st Grade",
            GradeLevel::Second => "2nd Grade",
            GradeLevel::Third => "3rd Grade",
            GradeLevel::Fourth => "4th Grade",
            GradeLevel::Fifth => "5th Grade",
            GradeLevel::Sixth => "6th Grade",
            GradeLevel::Seventh => "7th Grade",
            GradeLevel::Eighth => "8th Grade",
            GradeLevel::Ninth => "9th Grade",
            GradeLevel::Tenth => "10th Grade",
            GradeLevel::Eleventh => "11th Grade",
            GradeLevel::Twelfth => "12th Grade",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Kindergarten" => Some(GradeLevel::Kindergarten),
            "1st Grade" => Some(GradeLevel::First),
            "2nd Grade" => Some(GradeLevel::Second),
            "3rd Grade" => Some(GradeLevel::Third),
            "4th Grade" => Some(GradeLevel::Fourth),
            "5th Grade" => Some(GradeLevel::Fifth),
            "6th Grade" => Some(GradeLevel::Sixth),
            "7th Grade" => Some(GradeLevel::Seventh),
            "8th Grade" => Some(GradeLevel::Eighth),
            "9th Grade" => Some(GradeLevel::Ninth),
            "10th Grade" => Some(GradeLevel::Tenth),
            "11th Grade" => Some(GradeLevel::Eleventh),
            "12th Grade" => Some(GradeLevel::Twelfth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            "excused" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Mother,
    Father,
    Stepmother,
    Stepfather,
    Grandmother,
    Grandfather,
    Aunt,
    Uncle,
    Guardian,
    Other,
}

impl Relationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Relationship::Mother => "mother",
            Relationship::Father => "father",
            Relationship::Stepmother => "stepmother",
            Relationship::Stepfather => "stepfather",
            Relationship::Grandmother => "grandmother",
            Relationship::Grandfather => "grandfather",
            Relationship::Aunt => "aunt",
            Relationship::Uncle => "uncle",
            Relationship::Guardian => "guardian",
            Relationship::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "mother" => Some(Relationship::Mother),
            "father" => Some(Relationship::Father),
            "stepmother" => Some(Relationship::Stepmother),
            "stepfather" => Some(Relationship::Stepfather),
            "grandmother" => Some(Relationship::Grandmother),
            "grandfather" => Some(Relationship::Grandfather),
            "aunt" => Some(Relationship::Aunt),
            "uncle" => Some(Relationship::Uncle),
            "guardian" => Some(Relationship::Guardian),
            "other" => Some(Relationship::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationType {
    Meeting,
    Phone,
    Email,
    Other,
}

impl CommunicationType {
    pub fn as_str(self) -> &'static str {
        match self {
            CommunicationType::Meeting => "meeting",
            CommunicationType::Phone => "phone",
            CommunicationType::Email => "email",
            CommunicationType::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "meeting" => Some(CommunicationType::Meeting),
            "phone" => Some(CommunicationType::Phone),
            "email" => Some(CommunicationType::Email),
            "other" => Some(CommunicationType::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    FirstQuarter,
    SecondQuarter,
    ThirdQuarter,
    FourthQuarter,
    FirstSemester,
    SecondSemester,
    FinalExam,
    MidTermExam,
}

impl Term {
    pub fn label(self) -> &'static str {
        match self {
            Term::FirstQuarter => "First Quarter",
            Term::SecondQuarter => "Second Quarter",
            Term::ThirdQuarter => "Third Quarter",
            Term::FourthQuarter => "Fourth Quarter",
            Term::FirstSemester => "First Semester",
            Term::SecondSemester => "Second Semester",
            Term::FinalExam => "Final Exam",
            Term::MidTermExam => "Mid-term Exam",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "First Quarter" => Some(Term::FirstQuarter),
            "Second Quarter" => Some(Term::SecondQuarter),
            "Third Quarter" => Some(Term::ThirdQuarter),
            "Fourth Quarter" => Some(Term::FourthQuarter),
            "First Semester" => Some(Term::FirstSemester),
            "Second Semester" => Some(Term::SecondSemester),
            "Final Exam" => Some(Term::FinalExam),
            "Mid-term Exam" => Some(Term::MidTermExam),
            _ => None,
        }
    }
}

macro_rules! string_enum_serde {
    ($ty:ty, $to:ident, $from:path, $what:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.$to())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                $from(&raw)
                    .ok_or_else(|| D::Error::custom(format!(concat!("unknown ", $what, ": {}"), raw)))
            }
        }
    };
}

string_enum_serde!(StudentStatus, as_str, StudentStatus::parse, "student status");
string_enum_serde!(GradeLevel, label, GradeLevel::parse, "grade level");
string_enum_serde!(AttendanceStatus, as_str, AttendanceStatus::parse, "attendance status");
string_enum_serde!(Relationship, as_str, Relationship::parse, "relationship");
string_enum_serde!(CommunicationType, as_str, CommunicationType::parse, "communication type");
string_enum_serde!(Term, label, Term::parse, "term");

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub grade: GradeLevel,
    pub enrollment_date: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_email: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_relationship: String,
    pub status: StudentStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDraft {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub grade: GradeLevel,
    pub enrollment_date: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    #[serde(default)]
    pub guardian_email: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_relationship: String,
    #[serde(default)]
    pub status: StudentStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub grade: Option<GradeLevel>,
    pub enrollment_date: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub guardian_email: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub status: Option<StudentStatus>,
}

impl Entity for Student {
    type Draft = StudentDraft;
    type Patch = StudentPatch;

    const KIND: &'static str = "student";

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, draft: StudentDraft) -> Self {
        Student {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            date_of_birth: draft.date_of_birth,
            grade: draft.grade,
            enrollment_date: draft.enrollment_date,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            guardian_name: draft.guardian_name,
            guardian_phone: draft.guardian_phone,
            guardian_email: draft.guardian_email,
            emergency_contact_name: draft.emergency_contact_name,
            emergency_contact_phone: draft.emergency_contact_phone,
            emergency_contact_relationship: draft.emergency_contact_relationship,
            status: draft.status,
        }
    }

    fn merge(&mut self, patch: StudentPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = patch.grade {
            self.grade = v;
        }
        if let Some(v) = patch.enrollment_date {
            self.enrollment_date = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.address {
            self.address = v;
        }
        if let Some(v) = patch.guardian_name {
            self.guardian_name = v;
        }
        if let Some(v) = patch.guardian_phone {
            self.guardian_phone = v;
        }
        if let Some(v) = patch.guardian_email {
            self.guardian_email = Some(v);
        }
        if let Some(v) = patch.emergency_contact_name {
            self.emergency_contact_name = v;
        }
        if let Some(v) = patch.emergency_contact_phone {
            self.emergency_contact_phone = v;
        }
        if let Some(v) = patch.emergency_contact_relationship {
            self.emergency_contact_relationship = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub relationship: Relationship,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_phone: Option<String>,
    pub student_ids: Vec<i64>,
    pub is_primary: bool,
    pub emergency_contact: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    pub relationship: Relationship,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub work_phone: Option<String>,
    pub student_ids: Vec<i64>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub emergency_contact: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub relationship: Option<Relationship>,
    pub occupation: Option<String>,
    pub work_phone: Option<String>,
    pub student_ids: Option<Vec<i64>>,
    pub is_primary: Option<bool>,
    pub emergency_contact: Option<bool>,
}

impl Entity for Parent {
    type Draft = ParentDraft;
    type Patch = ParentPatch;

    const KIND: &'static str = "parent";

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, draft: ParentDraft) -> Self {
        Parent {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            relationship: draft.relationship,
            occupation: draft.occupation,
            work_phone: draft.work_phone,
            student_ids: draft.student_ids,
            is_primary: draft.is_primary,
            emergency_contact: draft.emergency_contact,
        }
    }

    fn merge(&mut self, patch: ParentPatch) {
        if let Some(v) = patch.first_name {
            self.first_name = v;
        }
        if let Some(v) = patch.last_name {
            self.last_name = v;
        }
        if let Some(v) = patch.email {
            self.email = v;
        }
        if let Some(v) = patch.phone {
            self.phone = v;
        }
        if let Some(v) = patch.address {
            self.address = Some(v);
        }
        if let Some(v) = patch.relationship {
            self.relationship = v;
        }
        if let Some(v) = patch.occupation {
            self.occupation = Some(v);
        }
        if let Some(v) = patch.work_phone {
            self.work_phone = Some(v);
        }
        if let Some(v) = patch.student_ids {
            self.student_ids = v;
        }
        if let Some(v) = patch.is_primary {
            self.is_primary = v;
        }
        if let Some(v) = patch.emergency_contact {
            self.emergency_contact = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
    pub max_score: f64,
    pub term: Term,
    pub date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDraft {
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
    pub max_score: f64,
    pub term: Term,
    pub date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradePatch {
    pub student_id: Option<i64>,
    pub subject: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub term: Option<Term>,
    pub date: Option<String>,
}

impl Entity for Grade {
    type Draft = GradeDraft;
    type Patch = GradePatch;

    const KIND: &'static str = "grade";

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, draft: GradeDraft) -> Self {
        Grade {
            id,
            student_id: draft.student_id,
            subject: draft.subject,
            score: draft.score,
            max_score: draft.max_score,
            term: draft.term,
            date: draft.date,
        }
    }

    fn merge(&mut self, patch: GradePatch) {
        if let Some(v) = patch.student_id {
            self.student_id = v;
        }
        if let Some(v) = patch.subject {
            self.subject = v;
        }
        if let Some(v) = patch.score {
            self.score = v;
        }
        if let Some(v) = patch.max_score {
            self.max_score = v;
        }
        if let Some(v) = patch.term {
            self.term = v;
        }
        if let Some(v) = patch.date {
            self.date = v;
        }
    }
}

/// One status per (studentId, date) pair; the marking workflow upserts on
/// that key so duplicates never exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub date: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDraft {
    pub student_id: i64,
    pub date: String,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePatch {
    pub student_id: Option<i64>,
    pub date: Option<String>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

impl Entity for AttendanceRecord {
    type Draft = AttendanceDraft;
    type Patch = AttendancePatch;

    const KIND: &'static str = "attendance record";

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, draft: AttendanceDraft) -> Self {
        AttendanceRecord {
            id,
            student_id: draft.student_id,
            date: draft.date,
            status: draft.status,
            notes: draft.notes,
        }
    }

    fn merge(&mut self, patch: AttendancePatch) {
        if let Some(v) = patch.student_id {
            self.student_id = v;
        }
        if let Some(v) = patch.date {
            self.date = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.notes {
            self.notes = Some(v);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    pub id: i64,
    pub parent_id: i64,
    pub teacher_id: i64,
    pub student_ids: Vec<i64>,
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    pub subject: String,
    pub notes: String,
    pub follow_up_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationDraft {
    pub parent_id: i64,
    pub teacher_id: i64,
    #[serde(default)]
    pub student_ids: Vec<i64>,
    #[serde(rename = "type")]
    pub kind: CommunicationType,
    pub subject: String,
    pub notes: String,
    #[serde(default)]
    pub follow_up_required: bool,
    #[serde(default)]
    pub follow_up_date: Option<String>,
    // Assigned by the daemon, never taken from the caller.
    #[serde(skip)]
    pub created_at: String,
    #[serde(skip)]
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPatch {
    pub parent_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub student_ids: Option<Vec<i64>>,
    #[serde(rename = "type")]
    pub kind: Option<CommunicationType>,
    pub subject: Option<String>,
    pub notes: Option<String>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<String>,
    #[serde(skip)]
    pub updated_at: Option<String>,
}

impl Entity for Communication {
    type Draft = CommunicationDraft;
    type Patch = CommunicationPatch;

    const KIND: &'static str = "communication";

    fn id(&self) -> i64 {
        self.id
    }

    fn assemble(id: i64, draft: CommunicationDraft) -> Self {
        Communication {
            id,
            parent_id: draft.parent_id,
            teacher_id: draft.teacher_id,
            student_ids: draft.student_ids,
            kind: draft.kind,
            subject: draft.subject,
            notes: draft.notes,
            follow_up_required: draft.follow_up_required,
            follow_up_date: draft.follow_up_date,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        }
    }

    fn merge(&mut self, patch: CommunicationPatch) {
        if let Some(v) = patch.parent_id {
            self.parent_id = v;
        }
        if let Some(v) = patch.teacher_id {
            self.teacher_id = v;
        }
        if let Some(v) = patch.student_ids {
            self.student_ids = v;
        }
        if let Some(v) = patch.kind {
            self.kind = v;
        }
        if let Some(v) = patch.subject {
            self.subject = v;
        }
        if let Some(v) = patch.notes {
            self.notes = v;
        }
        if let Some(v) = patch.follow_up_required {
            self.follow_up_required = v;
            if !self.follow_up_required {
                self.follow_up_date = None;
            }
        }
        if let Some(v) = patch.follow_up_date {
            self.follow_up_date = Some(v);
        }
        if let Some(v) = patch.updated_at {
            self.updated_at = v;
        }
    }
}
