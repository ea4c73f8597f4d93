use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, info},
};

use {
    chatrelay_channels::{AutomationChannel, AutomationRequest},
    chatrelay_config::AutomationConfig,
};

/// JSON answer shape expected from the automation endpoint.
#[derive(Debug, Deserialize)]
struct AutomationResponse {
    #[serde(default)]
    response: Option<String>,
}

/// HTTP client for the automation webhook.
pub struct WebhookAutomationClient {
    http: reqwest::Client,
    webhook_url: String,
    api_key: Secret<String>,
}

impl WebhookAutomationClient {
    /// Build from config. The per-request timeout lives on the client so a
    /// hung endpoint cannot outlive the engine's own deadline by much.
    pub fn from_config(config: &AutomationConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            webhook_url: config.webhook_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AutomationChannel for WebhookAutomationClient {
    async fn answer(&self, request: &AutomationRequest) -> anyhow::Result<Option<String>> {
        if self.webhook_url.is_empty() {
            anyhow::bail!("automation webhook URL not configured");
        }

        debug!(
            session_id = %request.session_id,
            url = %self.webhook_url,
            "posting to automation webhook"
        );

        let response = self
            .http
            .post(&self.webhook_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("automation endpoint returned {status}");
        }

        let parsed: AutomationResponse = response.json().await?;
        let answer = parsed
            .response
            .filter(|text| !text.trim().is_empty());

        info!(
            session_id = %request.session_id,
            answered = answer.is_some(),
            "automation webhook responded"
        );
        Ok(answer)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AutomationRequest {
        AutomationRequest {
            message: "Do you offer hosting?".into(),
            session_id: "chat-juan_a1b2c3".into(),
            visitor: "Juan".into(),
            site: "Acme Web".into(),
            timestamp: "2024-05-01 12:00:00".into(),
        }
    }

    fn client_for(server: &mockito::ServerGuard) -> WebhookAutomationClient {
        let config = AutomationConfig {
            enabled: true,
            webhook_url: format!("{}/hook", server.url()),
            api_key: Secret::new("test-key".into()),
            timeout_secs: 2,
            keywords: vec!["hosting".into()],
        };
        WebhookAutomationClient::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn returns_the_answer_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(r#"{"response": "Yes, plans start at $5/month."}"#)
            .create_async()
            .await;

        let answer = client_for(&server).answer(&request()).await.unwrap();
        assert_eq!(answer.as_deref(), Some("Yes, plans start at $5/month."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_response_means_no_answer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body(r#"{"response": ""}"#)
            .create_async()
            .await;

        let answer = client_for(&server).answer(&request()).await.unwrap();
        assert_eq!(answer, None);
    }

    #[tokio::test]
    async fn missing_response_field_means_no_answer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let answer = client_for(&server).answer(&request()).await.unwrap();
        assert_eq!(answer, None);
    }

    #[tokio::test]
    async fn non_2xx_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(500)
            .with_body("workflow crashed")
            .create_async()
            .await;

        let result = client_for(&server).answer(&request()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn posts_the_expected_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "message": "Do you offer hosting?",
                "session_id": "chat-juan_a1b2c3",
                "visitor": "Juan",
                "site": "Acme Web",
            })))
            .with_status(200)
            .with_body(r#"{"response": "ok"}"#)
            .create_async()
            .await;

        client_for(&server).answer(&request()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unconfigured_url_is_an_error() {
        let client = WebhookAutomationClient::from_config(&AutomationConfig::default()).unwrap();
        assert!(client.answer(&request()).await.is_err());
    }
}
