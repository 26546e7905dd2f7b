pub mod advice;
pub mod blood_pressure;
pub mod insights;
pub mod notifier;
pub mod report;

// Domain services
// This module contains business logic implementations.

use validator::ValidationErrors;

// Re-export service traits and factory functions
pub use blood_pressure::{
    create_default_blood_pressure_service, BloodPressureService, BloodPressureServiceTrait,
    ServiceError, VisitSummary,
};

/// Flatten validator errors into "field: message" pairs, sorted by field
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}
