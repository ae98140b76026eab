use std::sync::Arc;

use anyhow::Result;
use shared::domain::ExtractionParameters;
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

pub mod config;
pub mod error;
pub mod request;
pub mod session;
pub mod transport;
pub mod upload;
pub mod view;

pub use config::{load_settings, ClientSettings};
pub use error::{ClientError, TransportFailure};
pub use request::{ExtractionRequest, ExtractionRequestBuilder, ParameterField};
pub use session::{PaletteSession, PendingExtraction, SessionSnapshot};
pub use transport::{HttpPaletteService, PaletteService};
pub use upload::{ImageFile, UploadCoordinator, UploadPreview, UploadReceipt, UploadState};
pub use view::{PaletteRender, PaletteView, RequestLifecycle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed(UploadState),
    /// Another upload was in flight; nothing was sent.
    AlreadyInFlight,
    /// The selection changed while the upload was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Completed(RequestLifecycle),
    /// An extraction was already pending; nothing was sent.
    AlreadyPending,
    /// The image was replaced while the extraction was in flight.
    Discarded,
}

/// Async driver around a [`PaletteSession`]. The session lock is never held
/// across a network call, so parameter edits proceed while requests are in
/// flight and only affect the next request.
pub struct PaletteClient {
    inner: Mutex<PaletteSession>,
    service: Arc<dyn PaletteService>,
}

impl PaletteClient {
    pub fn new(settings: &ClientSettings) -> Result<Arc<Self>> {
        let service_url = settings.parsed_service_url()?;
        let service = HttpPaletteService::with_timeout(settings.request_timeout())?;
        Ok(Self::new_with_service(service_url, Arc::new(service)))
    }

    pub fn new_with_service(service_url: Url, service: Arc<dyn PaletteService>) -> Arc<Self> {
        info!(%service_url, "palette client ready");
        Arc::new(Self {
            inner: Mutex::new(PaletteSession::new(service_url)),
            service,
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    pub async fn with_session<R>(&self, f: impl FnOnce(&PaletteSession) -> R) -> R {
        let session = self.inner.lock().await;
        f(&session)
    }

    pub async fn select_file(&self, file: ImageFile) {
        self.inner.lock().await.select_file(file);
    }

    /// Runs a parameter edit against the builder and returns the new parameters.
    pub async fn edit_parameters(
        &self,
        edit: impl FnOnce(&mut ExtractionRequestBuilder),
    ) -> ExtractionParameters {
        let mut session = self.inner.lock().await;
        edit(session.builder_mut());
        *session.builder().parameters()
    }

    /// Errs only on local preconditions; transport failures end in `UploadFailed`.
    pub async fn upload(&self) -> Result<UploadOutcome, ClientError> {
        let Some((url, pending)) = self.inner.lock().await.begin_upload()? else {
            return Ok(UploadOutcome::AlreadyInFlight);
        };

        let result = self.service.upload_image(&url, &pending.image).await;

        let mut session = self.inner.lock().await;
        if session.complete_upload(&pending, result) {
            Ok(UploadOutcome::Completed(session.upload().state()))
        } else {
            Ok(UploadOutcome::Discarded)
        }
    }

    /// Errs only on local preconditions; transport and body failures end in `Failed`.
    pub async fn request_extraction(&self) -> Result<ExtractionOutcome, ClientError> {
        let Some(pending) = self.inner.lock().await.begin_extraction()? else {
            return Ok(ExtractionOutcome::AlreadyPending);
        };

        let result = self.service.fetch_palette(&pending.request).await;

        let mut session = self.inner.lock().await;
        if session.complete_extraction(&pending, result) {
            Ok(ExtractionOutcome::Completed(session.view().lifecycle().clone()))
        } else {
            Ok(ExtractionOutcome::Discarded)
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
