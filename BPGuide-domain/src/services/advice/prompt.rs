use crate::entities::user::{Gender, User};
use crate::services::insights::categorize_blood_pressure;

/// The user attributes that shape the advice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientContext {
    pub age: u16,
    pub gender: Gender,
    pub language: String,
    pub problem: String,
}

impl From<&User> for PatientContext {
    fn from(user: &User) -> Self {
        Self {
            age: user.age,
            gender: user.gender,
            language: user.language.clone(),
            problem: user.problem.clone(),
        }
    }
}

/// Build the advice prompt for one reading
pub fn build_advice_prompt(context: &PatientContext, systolic: u16, diastolic: u16) -> String {
    let category = categorize_blood_pressure(systolic, diastolic);
    let problem = match context.problem.trim() {
        "" => "none",
        problem => problem,
    };
    let language = match context.language.trim() {
        "" => "English",
        language => language,
    };

    format!(
        "You are a careful health assistant.\n\
         Patient: {age}-year-old {gender}.\n\
         Known health problems: {problem}.\n\
         Blood pressure reading: {systolic}/{diastolic} mmHg ({category}).\n\
         Explain what this reading means for this patient and give practical lifestyle advice. \
         Say clearly when they should seek medical attention. \
         Keep the answer under 200 words and write it in {language}.",
        age = context.age,
        gender = context.gender.to_string().to_lowercase(),
        category = category.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(problem: &str) -> PatientContext {
        PatientContext {
            age: 45,
            gender: Gender::Male,
            language: "Spanish".to_string(),
            problem: problem.to_string(),
        }
    }

    #[test]
    fn test_prompt_carries_context_and_values() {
        let prompt = build_advice_prompt(&context("Diabetes"), 180, 110);
        assert!(prompt.contains("45-year-old male"));
        assert!(prompt.contains("Known health problems: Diabetes."));
        assert!(prompt.contains("180/110 mmHg (Hypertensive Crisis)"));
        assert!(prompt.contains("write it in Spanish"));
    }

    #[test]
    fn test_prompt_empty_problem() {
        let prompt = build_advice_prompt(&context("  "), 118, 76);
        assert!(prompt.contains("Known health problems: none."));
        assert!(prompt.contains("(Normal)"));
    }
}
