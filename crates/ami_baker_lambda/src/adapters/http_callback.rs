use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};

use crate::adapters::callback::{CallbackError, CallbackSender};

/// PUTs callback bodies to the presigned response URL.
///
/// The URL is signed for an empty content type, so the header is sent
/// explicitly empty.
#[derive(Clone)]
pub struct HttpCallbackSender {
    client: reqwest::Client,
}

impl HttpCallbackSender {
    pub fn new(timeout: Duration) -> Result<Self, CallbackError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                CallbackError::Transport(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self { client })
    }
}

impl CallbackSender for HttpCallbackSender {
    fn send(&self, response_url: &str, body: &[u8]) -> Result<(), CallbackError> {
        let client = self.client.clone();
        let url = response_url.to_string();
        let body = body.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .put(url)
                    .header(CONTENT_TYPE, HeaderValue::from_static(""))
                    .body(body)
                    .send()
                    .await
                    .map_err(|error| CallbackError::Transport(error.to_string()))?;

                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(CallbackError::Rejected {
                        status: status.as_u16(),
                    })
                }
            })
        })
    }
}
