use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct IdeaGenerateRequest {
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub(crate) topic: String,
    #[serde(default = "default_audience")]
    pub(crate) audience: String,
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 10, message = "count must be between 1 and 10"))]
    pub(crate) count: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuizGenerateRequest {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub(crate) topic: String,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: String,
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 20, message = "count must be between 1 and 20"))]
    pub(crate) count: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TeacherPrepRequest {
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[validate(length(min = 1, message = "topic must not be empty"))]
    pub(crate) topic: String,
    #[serde(default = "default_grade")]
    pub(crate) grade: String,
    #[serde(default = "default_count")]
    #[validate(range(min = 1, max = 20, message = "count must be between 1 and 20"))]
    pub(crate) count: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CodeTutorRequest {
    #[validate(length(min = 1, message = "language must not be empty"))]
    pub(crate) language: String,
    #[validate(length(min = 1, message = "question must not be empty"))]
    pub(crate) question: String,
    #[serde(default = "default_skill_level")]
    #[serde(alias = "skillLevel")]
    pub(crate) skill_level: String,
}

fn default_audience() -> String {
    "students".to_string()
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_grade() -> String {
    "8".to_string()
}

fn default_skill_level() -> String {
    "beginner".to_string()
}

fn default_count() -> u32 {
    5
}
