//! HTTP client for the CRM application server.

use async_trait::async_trait;

use super::{BookingRequest, CallStatusSink, CallStatusUpdate, CrmError, MeetingScheduler};

/// Client for the CRM REST API.
///
/// - `PATCH {base}/api/calls/{callSid}` updates a call record
/// - `POST {base}/api/meetings` books a meeting
#[derive(Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl CrmClient {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<(), CrmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(CrmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CallStatusSink for CrmClient {
    async fn update_call_status(
        &self,
        call_sid: &str,
        update: &CallStatusUpdate,
    ) -> Result<(), CrmError> {
        let url = format!("{}/api/calls/{}", self.base_url, call_sid);
        tracing::debug!(call_sid = %call_sid, status = %update.status, "Updating CRM call record");
        let response = self
            .authorize(self.client.patch(&url))
            .json(update)
            .send()
            .await?;
        Self::check(response).await
    }
}

#[async_trait]
impl MeetingScheduler for CrmClient {
    async fn book_meeting(&self, request: &BookingRequest) -> Result<(), CrmError> {
        let url = format!("{}/api/meetings", self.base_url);
        tracing::debug!(date = %request.date, "Creating CRM meeting");
        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        Self::check(response).await
    }
}
