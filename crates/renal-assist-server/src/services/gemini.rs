use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::GeneratorConfig;
use crate::models::chat::Role;
use crate::services::orchestrator::{GenerationRequest, GenerativeResponder, GeneratorError};

/// Gemini `generateContent` client
#[derive(Clone)]
pub struct GeminiService {
    client: Client,
    config: GeneratorConfig,
}

// ===== Request structures =====

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize, Debug)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Filter categories relaxed to `BLOCK_NONE` on every request
const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

// ===== Response structures =====

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<GeminiErrorBody>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiContent {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: text.to_string(),
            }],
        }
    }
}

impl GeminiService {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout())
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn build_request(request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<GeminiContent> = request
            .prior_turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                GeminiContent::text(Some(role), &turn.content)
            })
            .collect();
        contents.push(GeminiContent::text(Some("user"), &request.user_message));

        GenerateContentRequest {
            system_instruction: GeminiContent::text(None, &request.system_context),
            contents,
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 1000,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }

    fn extract_reply(body: GenerateContentResponse) -> Result<String, GeneratorError> {
        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeneratorError::SafetyBlocked(reason));
        }

        if let Some(candidate) = body.candidates.into_iter().next() {
            if candidate.finish_reason.as_deref() == Some("SAFETY") {
                return Err(GeneratorError::SafetyBlocked("SAFETY".to_string()));
            }

            let text = candidate
                .content
                .and_then(|c| c.parts.into_iter().next())
                .map(|p| p.text)
                .filter(|t| !t.trim().is_empty());

            if let Some(text) = text {
                return Ok(text);
            }
        }

        match body.error {
            Some(err) => Err(GeneratorError::Malformed(err.message)),
            None => Err(GeneratorError::Malformed(
                "Invalid API response structure".to_string(),
            )),
        }
    }
}

#[async_trait]
impl GenerativeResponder for GeminiService {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError> {
        if !self.config.is_configured() {
            return Err(GeneratorError::NotConfigured);
        }

        debug!(
            "Calling Gemini model={} with {} prior turn(s)",
            self.config.model,
            request.prior_turns.len()
        );

        let body = Self::build_request(&request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout
                } else {
                    GeneratorError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            warn!("Gemini API error ({}): {}", status, snippet);
            return Err(GeneratorError::Http {
                status,
                body: snippet,
            });
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            GeneratorError::Malformed(e.to_string())
        })?;

        let reply = Self::extract_reply(parsed)?;
        debug!("Gemini reply received ({} chars)", reply.len());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::{ConversationTurn, TurnMetadata};
    use chrono::Utc;

    fn parse(json: &str) -> Result<String, GeneratorError> {
        let body: GenerateContentResponse = serde_json::from_str(json).unwrap();
        GeminiService::extract_reply(body)
    }

    #[test]
    fn test_build_request_maps_roles_and_appends_question() {
        let turn = |role, content: &str| ConversationTurn {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            metadata: TurnMetadata::default(),
        };
        let request = GenerationRequest {
            system_context: "be kind".to_string(),
            prior_turns: vec![turn(Role::User, "hi"), turn(Role::Assistant, "hello")],
            user_message: "what about salt?".to_string(),
        };

        let json = serde_json::to_value(GeminiService::build_request(&request)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be kind");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "what about salt?");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 1000);

        let safety = json["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 4);
        assert_eq!(safety[0]["category"], "HARM_CATEGORY_HARASSMENT");
        assert_eq!(safety[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
        assert!(safety.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
    }

    #[test]
    fn test_extract_reply_text() {
        let reply = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Drink water."}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(reply.unwrap(), "Drink water.");
    }

    #[test]
    fn test_extract_reply_safety_block() {
        let reply = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert!(matches!(reply, Err(GeneratorError::SafetyBlocked(_))));

        let reply = parse(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#);
        assert!(matches!(reply, Err(GeneratorError::SafetyBlocked(_))));
    }

    #[test]
    fn test_extract_reply_malformed() {
        assert!(matches!(parse("{}"), Err(GeneratorError::Malformed(_))));
        assert!(matches!(
            parse(r#"{"error":{"message":"quota exceeded"}}"#),
            Err(GeneratorError::Malformed(m)) if m == "quota exceeded"
        ));
        assert!(matches!(
            parse(r#"{"candidates":[{"content":{"parts":[]}}]}"#),
            Err(GeneratorError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let service = GeminiService::new(GeneratorConfig::default());
        let result = service
            .generate(GenerationRequest {
                system_context: String::new(),
                prior_turns: Vec::new(),
                user_message: "hi".to_string(),
            })
            .await;
        assert!(matches!(result, Err(GeneratorError::NotConfigured)));
    }
}
