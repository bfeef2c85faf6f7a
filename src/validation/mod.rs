pub mod rules;
pub mod validator;

pub use rules::{DetectionSet, GradeSet, RegionSet, ValidationRule, Violation};
pub use validator::Validator;
