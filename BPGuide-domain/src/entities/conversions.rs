use bp_guide_data::models::blood_pressure::{NewReading, ReadingRecord};
use bp_guide_data::models::user::{NewUser, StoredGender, UserRecord};

use crate::entities::blood_pressure::{BloodPressureReading, PressureValues};
use crate::entities::user::{Gender, RegisterUserRequest, User};

/// Conversion functions between domain entities and data models
/// These follow the pattern convert_to_[target_layer]_[model_name]

/// Convert from data model to domain entity for a user
pub fn convert_to_domain_user(record: UserRecord) -> User {
    User {
        user_id: record.user_id,
        name: record.name,
        age: record.age,
        gender: convert_to_domain_gender(record.gender),
        language: record.language,
        problem: record.problem,
        created_at: record.created_at,
    }
}

/// Convert from data model to domain entity for a reading
pub fn convert_to_domain_reading(record: ReadingRecord) -> BloodPressureReading {
    BloodPressureReading {
        id: record.id,
        user_id: record.user_id,
        systolic: record.systolic,
        diastolic: record.diastolic,
        recorded_at: record.recorded_at,
    }
}

pub fn convert_to_domain_gender(gender: StoredGender) -> Gender {
    match gender {
        StoredGender::Male => Gender::Male,
        StoredGender::Female => Gender::Female,
        StoredGender::Other => Gender::Other,
    }
}

pub fn convert_to_data_gender(gender: Gender) -> StoredGender {
    match gender {
        Gender::Male => StoredGender::Male,
        Gender::Female => StoredGender::Female,
        Gender::Other => StoredGender::Other,
    }
}

/// Convert a registration request into the data layer's new-user model
pub fn convert_to_data_new_user(request: &RegisterUserRequest) -> NewUser {
    NewUser {
        user_id: request.user_id,
        name: request.name.trim().to_string(),
        age: request.age,
        gender: convert_to_data_gender(request.gender),
        language: request.language.trim().to_string(),
        problem: request.problem.trim().to_string(),
    }
}

pub fn convert_to_data_new_reading(values: PressureValues) -> NewReading {
    NewReading {
        systolic: values.systolic,
        diastolic: values.diastolic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_round_trip() {
        for gender in [Gender::Male, Gender::Female, Gender::Other] {
            assert_eq!(convert_to_domain_gender(convert_to_data_gender(gender)), gender);
        }
    }

    #[test]
    fn test_new_user_is_trimmed() {
        let request = RegisterUserRequest {
            user_id: 1234,
            name: "  Ana ".to_string(),
            age: 45,
            gender: Gender::Female,
            language: " Spanish".to_string(),
            problem: "none ".to_string(),
        };
        let new_user = convert_to_data_new_user(&request);
        assert_eq!(new_user.name, "Ana");
        assert_eq!(new_user.language, "Spanish");
        assert_eq!(new_user.problem, "none");
        assert_eq!(new_user.gender, StoredGender::Female);
    }
}
