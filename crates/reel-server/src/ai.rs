use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Subjects the scheduled bot account posts about.
pub const POST_SUBJECTS: &[&str] = &[
    "Harry Potter and the Philosopher's Stone",
    "The Lord of the Rings: The Return of the King",
    "Inception",
    "Fight Club",
    "The Matrix",
    "Interstellar",
    "The Social Network",
    "Mad Max: Fury Road",
    "The Wolf of Wall Street",
    "Parasite",
    "Whiplash",
    "Joker",
    "Avengers: Endgame",
    "La La Land",
    "Black Panther",
    "Spider-Man: Into the Spider-Verse",
    "Toy Story 3",
    "Frozen",
    "The Grand Budapest Hotel",
    "Guardians of the Galaxy",
    "Get Out",
    "Coco",
    "A Star is Born",
    "Once Upon a Time in Hollywood",
];

/// Minimal chat-completions client for the text helper endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl OpenAiClient {
    pub fn new(cfg: &AiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: 150,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send completion request")?;

        if !response.status().is_success() {
            bail!("Completion request failed: {}", response.status());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to decode completion response")?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Completion response had no choices")
    }

    /// Rewrite review text into something more readable, keeping the
    /// author's opinion intact.
    pub async fn enhance_review(&self, text: &str) -> Result<String> {
        self.complete(&enhance_prompt(text)).await
    }

    /// Short feed-ready description of a subject for the scheduled bot post.
    pub async fn post_description(&self, subject: &str) -> Result<String> {
        self.complete(&description_prompt(subject)).await
    }
}

fn enhance_prompt(text: &str) -> String {
    format!(
        "Improve the grammar and flow of this movie review without changing \
         its opinion or adding new claims. Reply with the rewritten review \
         only: {text}"
    )
}

fn description_prompt(subject: &str) -> String {
    format!(
        "Write a description in 10 words about {subject} that reads like an \
         Instagram post caption, mentioning the title by name"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_embed_input() {
        assert!(enhance_prompt("loved it").contains("loved it"));
        assert!(description_prompt("Inception").contains("Inception"));
    }

    #[test]
    fn test_subjects_nonempty_and_distinct() {
        assert!(!POST_SUBJECTS.is_empty());
        let unique: std::collections::HashSet<_> = POST_SUBJECTS.iter().collect();
        assert_eq!(unique.len(), POST_SUBJECTS.len());
    }

    #[test]
    fn test_chat_request_wire_format() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 150,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_chat_response_decoding() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"A dream within a dream."}}]}"#;
        let decoded: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            decoded.choices[0].message.content,
            "A dream within a dream."
        );
    }
}
