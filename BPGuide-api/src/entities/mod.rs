// Public entities for the BPGuide API
// Data structures shared across the HTTP boundary; JSON fields are camelCase apart from a reading's recorded_at

// Users and registration
pub mod user;

// Readings, history and insights
pub mod blood_pressure;

// Advice, chat and reports
pub mod advice;

// Error responses
pub mod common;
