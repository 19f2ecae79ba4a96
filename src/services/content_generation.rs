use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::config::Settings;

const IDEA_SYSTEM_PROMPT: &str = r#"You are a creative teaching assistant who proposes classroom project ideas.

Respond with strict JSON:
{
  "ideas": [
    {
      "title": "short idea title",
      "description": "two or three sentences",
      "materials": ["material 1", "material 2"],
      "duration_minutes": <number>
    }
  ]
}
"#;

const QUIZ_SYSTEM_PROMPT: &str = r#"You are an exam author who writes multiple-choice quizzes.

Respond with strict JSON:
{
  "questions": [
    {
      "id": "q1",
      "prompt": "question text",
      "options": ["option a", "option b", "option c", "option d"],
      "correct_answer": "exactly one of the options",
      "explanation": "one sentence"
    }
  ]
}
"#;

const PREP_SYSTEM_PROMPT: &str = r#"You are helping a teacher rehearse a lesson by quizzing them on the material they are about to teach.

Respond with strict JSON:
{
  "questions": [
    {
      "id": "q1",
      "prompt": "question text",
      "options": ["option a", "option b", "option c", "option d"],
      "correct_answer": "exactly one of the options",
      "teaching_tip": "one sentence on presenting this point"
    }
  ]
}
"#;

const TUTOR_SYSTEM_PROMPT: &str = r#"You are a patient programming tutor for school students.

Respond with strict JSON:
{
  "explanation": "plain-language explanation",
  "code_example": "a short runnable snippet",
  "common_mistakes": ["mistake 1", "mistake 2"],
  "practice_exercise": "one follow-up exercise"
}
"#;

#[derive(Debug, Clone)]
pub(crate) struct PromptSpec {
    pub(crate) system: &'static str,
    pub(crate) user: String,
}

pub(crate) fn idea_prompt(topic: &str, audience: &str, count: u32) -> PromptSpec {
    PromptSpec {
        system: IDEA_SYSTEM_PROMPT,
        user: format!(
            "Propose {count} classroom project ideas about \"{topic}\" for {audience}.\n\
             Keep every idea achievable with ordinary school resources.\n\
             Use the JSON format from the system prompt."
        ),
    }
}

pub(crate) fn quiz_prompt(subject: &str, topic: &str, difficulty: &str, count: u32) -> PromptSpec {
    PromptSpec {
        system: QUIZ_SYSTEM_PROMPT,
        user: format!(
            "Write {count} {difficulty} multiple-choice questions for {subject} on the topic \
             \"{topic}\".\nEach question needs exactly four options and one correct answer.\n\
             Use the JSON format from the system prompt."
        ),
    }
}

pub(crate) fn teacher_prep_prompt(subject: &str, topic: &str, grade: &str, count: u32) -> PromptSpec {
    PromptSpec {
        system: PREP_SYSTEM_PROMPT,
        user: format!(
            "A teacher is preparing a grade {grade} {subject} lesson on \"{topic}\".\n\
             Write {count} questions that test whether the teacher has the material down cold,\n\
             including edge cases students tend to ask about.\n\
             Use the JSON format from the system prompt."
        ),
    }
}

pub(crate) fn code_tutor_prompt(language: &str, question: &str, skill_level: &str) -> PromptSpec {
    PromptSpec {
        system: TUTOR_SYSTEM_PROMPT,
        user: format!(
            "A {skill_level} student learning {language} asks:\n{question}\n\
             Answer at their level.\nUse the JSON format from the system prompt."
        ),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct GenerationService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl GenerationService {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
            temperature: settings.ai().ai_temperature,
        })
    }

    /// One chat-completion round trip. A failure is returned as-is: these
    /// endpoints never retry, and the caller surfaces one generic error.
    pub(crate) async fn generate(&self, prompt: &PromptSpec) -> Result<Value> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Failed to call completion API")?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            anyhow::bail!("completion API error ({status}): {body}");
        }

        parse_content(&body)
    }
}

/// Pull `choices[0].message.content` out of a completion response and parse
/// it as JSON. The returned shape is whatever the model produced; nothing
/// beyond parse-or-fail is enforced.
pub(crate) fn parse_content(body: &Value) -> Result<Value> {
    let content = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|value| value.as_str())
        .context("Missing completion response content")?;

    serde_json::from_str(content).context("Failed to parse generated JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idea_prompt_embeds_inputs() {
        let prompt = idea_prompt("renewable energy", "grade 7 students", 5);
        assert!(prompt.user.contains("renewable energy"));
        assert!(prompt.user.contains("grade 7 students"));
        assert!(prompt.user.contains('5'));
    }

    #[test]
    fn quiz_prompt_embeds_inputs() {
        let prompt = quiz_prompt("Physics", "Newton's laws", "medium", 10);
        assert!(prompt.user.contains("Physics"));
        assert!(prompt.user.contains("Newton's laws"));
        assert!(prompt.user.contains("medium"));
        assert!(prompt.system.contains("correct_answer"));
    }

    #[test]
    fn code_tutor_prompt_embeds_question() {
        let prompt = code_tutor_prompt("Python", "What does a for loop do?", "beginner");
        assert!(prompt.user.contains("What does a for loop do?"));
        assert!(prompt.system.contains("code_example"));
    }

    #[test]
    fn parse_content_reads_first_choice() {
        let body = serde_json::json!({
            "choices": [
                {"message": {"content": "{\"questions\": []}"}}
            ]
        });

        let parsed = parse_content(&body).expect("parse");
        assert!(parsed["questions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn parse_content_rejects_missing_content() {
        let body = serde_json::json!({"choices": []});
        assert!(parse_content(&body).is_err());
    }

    #[test]
    fn parse_content_rejects_non_json_payload() {
        let body = serde_json::json!({
            "choices": [
                {"message": {"content": "Sure! Here are some ideas..."}}
            ]
        });

        assert!(parse_content(&body).is_err());
    }
}
