pub mod advice;
pub mod health;
pub mod readings;
pub mod reports;
pub mod users;

// Tests module
#[cfg(test)]
mod tests;

// Re-export handlers for easier imports
pub use advice::{chat, generate_advice};
pub use health::health_check;
pub use readings::{get_readings, update_blood_pressure};
pub use reports::send_report;
pub use users::{register_user, verify_existing_user, verify_user_id};
