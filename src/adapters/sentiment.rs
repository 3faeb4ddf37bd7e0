//! Fear & Greed index adapter (alternative.me).

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::Sentiment;
use crate::error::{HeraldError, Result};

const DEFAULT_API_BASE: &str = "https://api.alternative.me";

#[derive(Clone)]
pub struct FearGreedClient {
    http: Client,
    base_url: String,
}

impl FearGreedClient {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let http = Client::builder()
            .user_agent("herald/0.1 (market digest bot)")
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HeraldError::Internal(format!("failed to build Fear&Greed HTTP client: {}", e))
            })?;

        Ok(Self { http, base_url })
    }

    /// Latest index value and classification label
    pub async fn current(&self) -> Result<Sentiment> {
        let url = format!("{}/fng/", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HeraldError::Upstream(format!(
                "Fear&Greed fetch failed: status={} body={}",
                status, body
            )));
        }

        let envelope: FngEnvelope = resp.json().await?;
        let row = envelope.data.into_iter().next().ok_or_else(|| {
            HeraldError::InvalidPayload("Fear&Greed response has no data rows".to_string())
        })?;

        // The index value is served as a JSON string
        let value = row.value.trim().parse::<u32>().map_err(|_| {
            HeraldError::InvalidPayload(format!("non-numeric Fear&Greed value: {}", row.value))
        })?;

        Ok(Sentiment {
            value,
            label: row.value_classification,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FngEnvelope {
    #[serde(default)]
    data: Vec<FngRow>,
}

#[derive(Debug, Deserialize)]
struct FngRow {
    value: String,
    #[serde(default)]
    value_classification: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_parse() {
        let payload = r#"{
            "name": "Fear and Greed Index",
            "data": [
                {"value": "34", "value_classification": "Fear", "timestamp": "1719792000"}
            ]
        }"#;
        let envelope: FngEnvelope = serde_json::from_str(payload).unwrap();
        assert_eq!(envelope.data[0].value, "34");
        assert_eq!(envelope.data[0].value_classification, "Fear");
    }
}
