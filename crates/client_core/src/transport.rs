//! Network seam to the extraction service.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use shared::{
    domain::Palette,
    protocol::{UploadResponse, UPLOAD_FIELD},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::{ClientError, TransportFailure},
    request::ExtractionRequest,
    upload::{ImageFile, UploadPreview, UploadReceipt},
};

#[async_trait]
pub trait PaletteService: Send + Sync {
    async fn upload_image(&self, url: &Url, image: &ImageFile) -> Result<UploadReceipt, ClientError>;
    async fn fetch_palette(&self, request: &ExtractionRequest) -> Result<Palette, ClientError>;
}

pub struct HttpPaletteService {
    http: Client,
}

impl HttpPaletteService {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Default for HttpPaletteService {
    fn default() -> Self {
        Self::new()
    }
}

fn image_part(image: &ImageFile) -> Part {
    let part = || Part::bytes(image.bytes.clone()).file_name(image.filename.clone());
    match image.mime_type.as_deref() {
        Some(mime) => part().mime_str(mime).unwrap_or_else(|_| part()),
        None => part(),
    }
}

#[async_trait]
impl PaletteService for HttpPaletteService {
    async fn upload_image(&self, url: &Url, image: &ImageFile) -> Result<UploadReceipt, ClientError> {
        let transport = |err: reqwest::Error| {
            ClientError::UploadTransport(TransportFailure::from_reqwest(&err))
        };
        let form = Form::new().part(UPLOAD_FIELD, image_part(image));
        let response = self
            .http
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        debug!(%status, "upload response received");
        if status != StatusCode::OK {
            return Err(ClientError::UploadTransport(TransportFailure::Status(
                status.as_u16(),
            )));
        }

        // The acknowledgement is the status; the body only carries a preview.
        let preview = match response.json::<UploadResponse>().await {
            Ok(body) => body
                .base64_image
                .as_deref()
                .and_then(UploadPreview::from_data_url),
            Err(error) => {
                warn!(%error, "upload acknowledged with unreadable body; no preview");
                None
            }
        };
        info!(has_preview = preview.is_some(), "upload acknowledged");
        Ok(UploadReceipt { preview })
    }

    async fn fetch_palette(&self, request: &ExtractionRequest) -> Result<Palette, ClientError> {
        let transport = |err: reqwest::Error| {
            ClientError::ExtractionTransport(TransportFailure::from_reqwest(&err))
        };
        let response = self
            .http
            .get(request.url().clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::ExtractionTransport(TransportFailure::Status(
                status.as_u16(),
            )));
        }

        let body = response.bytes().await.map_err(transport)?;
        serde_json::from_slice::<Palette>(&body).map_err(|err| ClientError::MalformedResponse {
            endpoint: "extract",
            reason: err.to_string(),
        })
    }
}
