// Storage models for users and readings
pub mod blood_pressure;
pub mod user;

pub use blood_pressure::{NewReading, ReadingRecord, VisitUpdate};
pub use user::{NewUser, StoredGender, UserRecord};
