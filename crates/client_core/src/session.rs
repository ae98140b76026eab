//! The view-state record tying upload, parameters and palette together.

use shared::domain::{ExtractionParameters, Palette};
use tracing::{debug, info};
use url::Url;

use crate::{
    error::ClientError,
    request::{ExtractionRequest, ExtractionRequestBuilder},
    upload::{ImageFile, PendingUpload, UploadCoordinator, UploadReceipt, UploadState},
    view::{PaletteView, RequestLifecycle},
};

/// Request handed to the transport; tagged with the image selection it reads.
#[derive(Debug, Clone)]
pub struct PendingExtraction {
    selection: u64,
    pub request: ExtractionRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub upload_state: UploadState,
    pub parameters: ExtractionParameters,
    pub lifecycle: RequestLifecycle,
    pub extraction_enabled: bool,
    pub worker_count_visible: bool,
}

/// All transitions go through here; each component is only mutated by its
/// own methods and values are handed forward as snapshots.
#[derive(Debug)]
pub struct PaletteSession {
    upload: UploadCoordinator,
    builder: ExtractionRequestBuilder,
    view: PaletteView,
}

impl PaletteSession {
    pub fn new(service_url: Url) -> Self {
        Self {
            upload: UploadCoordinator::default(),
            builder: ExtractionRequestBuilder::new(service_url),
            view: PaletteView::default(),
        }
    }

    pub fn upload(&self) -> &UploadCoordinator {
        &self.upload
    }

    pub fn builder(&self) -> &ExtractionRequestBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut ExtractionRequestBuilder {
        &mut self.builder
    }

    pub fn view(&self) -> &PaletteView {
        &self.view
    }

    /// Extraction controls are only offered once the service holds the image.
    pub fn extraction_enabled(&self) -> bool {
        self.upload.is_uploaded()
    }

    pub fn worker_count_visible(&self) -> bool {
        self.builder.parameters().concurrent
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            upload_state: self.upload.state(),
            parameters: *self.builder.parameters(),
            lifecycle: self.view.lifecycle().clone(),
            extraction_enabled: self.extraction_enabled(),
            worker_count_visible: self.worker_count_visible(),
        }
    }

    pub fn select_file(&mut self, file: ImageFile) {
        self.upload.select_file(file);
    }

    pub fn begin_upload(&mut self) -> Result<Option<(Url, PendingUpload)>, ClientError> {
        let url = self.builder.upload_url()?;
        Ok(self.upload.begin_upload()?.map(|pending| (url, pending)))
    }

    pub fn complete_upload(
        &mut self,
        pending: &PendingUpload,
        result: Result<UploadReceipt, ClientError>,
    ) -> bool {
        self.upload.complete_upload(pending, result)
    }

    /// Fails with `NotUploaded` before the upload is acknowledged and returns
    /// `Ok(None)` while another extraction is pending.
    pub fn begin_extraction(&mut self) -> Result<Option<PendingExtraction>, ClientError> {
        let request = self.builder.build_request(self.upload.state())?;
        if !self.view.begin() {
            return Ok(None);
        }
        info!(url = %request.url(), "requesting palette extraction");
        Ok(Some(PendingExtraction {
            selection: self.upload.selection(),
            request,
        }))
    }

    /// Returns `false` if the result was not applied: nothing was pending, or
    /// the image it was extracted from has since been replaced.
    pub fn complete_extraction(
        &mut self,
        pending: &PendingExtraction,
        result: Result<Palette, ClientError>,
    ) -> bool {
        if !self.view.is_pending() {
            debug!("discarding extraction result with no pending request");
            return false;
        }
        if pending.selection != self.upload.selection() {
            debug!(url = %pending.request.url(), "discarding palette for a replaced image");
            self.view.discard();
            return false;
        }
        self.view.resolve(result);
        true
    }
}
