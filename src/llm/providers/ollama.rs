use crate::config::LlmConfig;
use crate::db::ResultTable;
use crate::llm::{extract, prompts, LlmError, TranslationEngine};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest {
    model: String,
    prompt: String,
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/api/generate".to_string());

        Ok(Self {
            client: reqwest::Client::new(),
            api_url,
            model: config.model.clone(),
        })
    }

    async fn complete(&self, prompt: String) -> Result<String, LlmError> {
        info!("Sending request to Ollama with model: {}", self.model);
        debug!("Prompt: {}", prompt);

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt,
            temperature: 0.1,
            stream: false,
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;
        debug!("Raw response from Ollama: {}", response_text);

        let parsed: OllamaResponse = serde_json::from_str(&response_text).map_err(|e| {
            LlmError::ResponseError(format!(
                "Failed to parse Ollama response: {} - Response was: {}",
                e, response_text
            ))
        })?;

        Ok(parsed.response)
    }
}

#[async_trait]
impl TranslationEngine for OllamaProvider {
    async fn generate_sql(&self, question: &str, schema: &str) -> Result<String, LlmError> {
        let content = self.complete(prompts::sql_prompt(question, schema)).await?;
        Ok(extract::extract_sql(&content))
    }

    async fn generate_chart_code(
        &self,
        question: &str,
        sql: &str,
        table: &ResultTable,
    ) -> Result<String, LlmError> {
        let content = self
            .complete(prompts::chart_prompt(question, sql, table))
            .await?;
        extract::extract_json_object(&content)
            .map(str::to_string)
            .ok_or_else(|| LlmError::ResponseError("No chart specification in response".to_string()))
    }
}
