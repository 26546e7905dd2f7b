// Domain entities
pub mod blood_pressure;
pub mod conversions;
pub mod user;
