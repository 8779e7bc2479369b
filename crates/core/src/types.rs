/// All primary keys are UUIDs. They travel as strings inside change-sets.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
