//! reqwest implementation of the circulation backend

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use super::{ActionOutcome, ActionRequest, ActionResponse, CirculationBackend, ItemWithLoan, SearchResult};
use crate::{
    config::BackendConfig,
    error::{DeskError, DeskResult},
    models::{CirculationAction, Item, Patron},
};

/// Error body the backend sends with non-2xx answers
#[derive(Deserialize)]
struct BackendErrorBody {
    message: String,
}

/// Single-item lookup envelope
#[derive(Deserialize)]
struct Envelope<T> {
    metadata: T,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> DeskResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!("Circulation backend at {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_action(
        &self,
        endpoint: &str,
        body: &ActionRequest,
        requested: Option<CirculationAction>,
    ) -> DeskResult<ActionOutcome> {
        tracing::debug!("POST item/{} for item {}", endpoint, body.item_pid);
        let response = self
            .authorize(self.client.post(self.url(&format!("item/{}", endpoint))))
            .json(body)
            .send()
            .await?;
        let response: ActionResponse = read_json(response).await?;
        response.into_outcome(requested)
    }
}

/// Decode a 2xx body, or turn the answer into a backend error with the server's detail
async fn read_json<T: DeserializeOwned>(response: Response) -> DeskResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<BackendErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    tracing::warn!("Backend answered {}: {}", status, message);

    Err(DeskError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// Like [`read_json`], with 404 meaning "no such record"
async fn read_optional_json<T: DeserializeOwned>(response: Response) -> DeskResult<Option<T>> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    read_json(response).await.map(Some)
}

/// Endpoint segment for a single action
fn action_endpoint(action: CirculationAction) -> &'static str {
    match action {
        CirculationAction::ValidateRequest => "validate",
        other => other.as_str(),
    }
}

#[async_trait]
impl CirculationBackend for HttpBackend {
    async fn find_patron(&self, barcode: &str) -> DeskResult<Option<Patron>> {
        tracing::debug!("Patron lookup for barcode {}", barcode);
        let response = self
            .authorize(self.client.get(self.url("patrons/")))
            .query(&[("q", format!("barcode:{}", barcode))])
            .send()
            .await?;

        let result: Option<SearchResult<Patron>> = read_optional_json(response).await?;
        Ok(result.and_then(|r| r.into_records().into_iter().next()))
    }

    async fn find_item(&self, barcode: &str, patron_pid: Option<String>) -> DeskResult<Option<Item>> {
        tracing::debug!("Item lookup for barcode {}", barcode);
        let mut request = self.client.get(self.url(&format!("item/barcode/{}", barcode)));
        if let Some(patron_pid) = patron_pid {
            request = request.query(&[("patron_pid", patron_pid)]);
        }
        let response = self.authorize(request).send().await?;

        let envelope: Option<Envelope<ItemWithLoan>> = read_optional_json(response).await?;
        Ok(envelope.map(|e| e.metadata.into()))
    }

    async fn patron_loans(&self, patron_pid: &str) -> DeskResult<Vec<Item>> {
        let response = self
            .authorize(self.client.get(self.url(&format!("item/loans/{}", patron_pid))))
            .send()
            .await?;

        let result: Option<SearchResult<ItemWithLoan>> = read_optional_json(response).await?;
        Ok(result
            .map(|r| r.into_records().into_iter().map(Item::from).collect())
            .unwrap_or_default())
    }

    async fn automatic_checkin(
        &self,
        item_barcode: &str,
        transaction_user_pid: Option<String>,
        transaction_library_pid: Option<String>,
    ) -> DeskResult<Option<ActionOutcome>> {
        tracing::debug!("Automatic checkin for barcode {}", item_barcode);
        let mut body = json!({ "item_barcode": item_barcode });
        if let Some(user_pid) = transaction_user_pid {
            body["transaction_user_pid"] = json!(user_pid);
        }
        if let Some(library_pid) = transaction_library_pid {
            body["transaction_library_pid"] = json!(library_pid);
        }

        let response = self
            .authorize(self.client.post(self.url("item/automatic_checkin")))
            .json(&body)
            .send()
            .await?;

        let response: Option<ActionResponse> = read_optional_json(response).await?;
        response.map(|r| r.into_outcome(None)).transpose()
    }

    async fn perform(&self, action: CirculationAction, request: ActionRequest) -> DeskResult<ActionOutcome> {
        if !action.is_submittable() {
            return Err(DeskError::BadRequest(format!(
                "action '{}' cannot be submitted",
                action
            )));
        }
        self.post_action(action_endpoint(action), &request, Some(action)).await
    }

    async fn validate_request(&self, request: ActionRequest) -> DeskResult<ActionOutcome> {
        self.post_action(
            action_endpoint(CirculationAction::ValidateRequest),
            &request,
            Some(CirculationAction::ValidateRequest),
        )
        .await
    }

    async fn requested_loans(&self, library_pid: &str) -> DeskResult<Vec<Item>> {
        let response = self
            .authorize(self.client.get(self.url(&format!("item/requested_loans/{}", library_pid))))
            .send()
            .await?;

        let result: SearchResult<ItemWithLoan> = read_json(response).await?;
        Ok(result.into_records().into_iter().map(Item::from).collect())
    }
}
