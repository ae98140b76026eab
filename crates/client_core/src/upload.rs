//! Selected-file ownership and the upload lifecycle.

use std::path::Path;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info, warn};

use crate::error::ClientError;

/// Image chosen by the user. No type or size checks happen locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read image '{}'", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(filename, bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    Uploaded,
    UploadFailed,
}

/// Image echoed back by the upload endpoint, decoded from its data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPreview {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadPreview {
    /// Accepts `data:<mime>;base64,<payload>` or a bare base64 payload.
    pub fn from_data_url(data_url: &str) -> Option<Self> {
        let (mime_type, payload) = match data_url.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',')?;
                let mime_type = header.strip_suffix(";base64")?;
                (mime_type.to_string(), payload)
            }
            None => ("application/octet-stream".to_string(), data_url),
        };
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        if bytes.is_empty() {
            return None;
        }
        Some(Self { mime_type, bytes })
    }
}

/// Outcome of an acknowledged upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReceipt {
    pub preview: Option<UploadPreview>,
}

/// Snapshot handed to the transport; tagged with the selection it belongs to.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub(crate) selection: u64,
    pub image: ImageFile,
}

#[derive(Debug, Default)]
pub struct UploadCoordinator {
    state: UploadState,
    file: Option<ImageFile>,
    selection: u64,
    in_flight: bool,
    preview: Option<UploadPreview>,
    last_error: Option<ClientError>,
}

impl UploadCoordinator {
    pub fn state(&self) -> UploadState {
        self.state
    }

    pub(crate) fn selection(&self) -> u64 {
        self.selection
    }

    pub fn preview(&self) -> Option<&UploadPreview> {
        self.preview.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub fn is_uploaded(&self) -> bool {
        self.state == UploadState::Uploaded
    }

    /// Replaces the selection unconditionally. A result for the previous
    /// selection that is still in flight will be discarded on arrival.
    pub fn select_file(&mut self, file: ImageFile) {
        debug!(filename = %file.filename, size = file.bytes.len(), "image selected");
        self.selection += 1;
        self.file = Some(file);
        self.state = UploadState::FileSelected;
        self.preview = None;
        self.last_error = None;
    }

    /// Returns `Ok(None)` when an upload is already in flight.
    pub fn begin_upload(&mut self) -> Result<Option<PendingUpload>, ClientError> {
        if self.in_flight {
            debug!("upload already in flight; ignoring request");
            return Ok(None);
        }
        let Some(image) = self.file.clone() else {
            return Err(ClientError::NoFileSelected);
        };

        self.in_flight = true;
        self.state = UploadState::Uploading;
        self.last_error = None;
        info!(filename = %image.filename, "uploading image");
        Ok(Some(PendingUpload {
            selection: self.selection,
            image,
        }))
    }

    /// Applies a resolved upload. Returns `false` if the result was stale.
    pub fn complete_upload(
        &mut self,
        pending: &PendingUpload,
        result: Result<UploadReceipt, ClientError>,
    ) -> bool {
        self.in_flight = false;
        if pending.selection != self.selection {
            debug!(
                filename = %pending.image.filename,
                "discarding upload result for a replaced selection"
            );
            return false;
        }

        match result {
            Ok(receipt) => {
                info!(filename = %pending.image.filename, "image uploaded");
                self.state = UploadState::Uploaded;
                self.preview = receipt.preview;
            }
            Err(error) => {
                warn!(filename = %pending.image.filename, %error, "image upload failed");
                self.state = UploadState::UploadFailed;
                self.last_error = Some(error);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;

    fn png() -> ImageFile {
        ImageFile::new("photo.png", vec![1, 2, 3])
    }

    #[test]
    fn upload_without_selection_fails() {
        let mut coordinator = UploadCoordinator::default();
        assert_eq!(
            coordinator.begin_upload().unwrap_err(),
            ClientError::NoFileSelected
        );
        assert_eq!(coordinator.state(), UploadState::Idle);
    }

    #[test]
    fn guesses_mime_type_from_filename() {
        assert_eq!(png().mime_type.as_deref(), Some("image/png"));
        assert_eq!(ImageFile::new("noext", vec![]).mime_type, None);
    }

    #[test]
    fn second_begin_while_uploading_is_ignored() {
        let mut coordinator = UploadCoordinator::default();
        coordinator.select_file(png());
        assert!(coordinator.begin_upload().unwrap().is_some());
        assert!(coordinator.begin_upload().unwrap().is_none());
        assert_eq!(coordinator.state(), UploadState::Uploading);
    }

    #[test]
    fn failed_upload_never_reaches_uploaded() {
        let mut coordinator = UploadCoordinator::default();
        coordinator.select_file(png());
        let pending = coordinator.begin_upload().unwrap().unwrap();
        let applied = coordinator.complete_upload(
            &pending,
            Err(ClientError::UploadTransport(TransportFailure::Status(500))),
        );
        assert!(applied);
        assert_eq!(coordinator.state(), UploadState::UploadFailed);
        assert!(coordinator.last_error().is_some());
    }

    #[test]
    fn reselection_discards_in_flight_result_but_keeps_single_flight() {
        let mut coordinator = UploadCoordinator::default();
        coordinator.select_file(png());
        let pending = coordinator.begin_upload().unwrap().unwrap();

        coordinator.select_file(ImageFile::new("other.jpg", vec![9]));
        assert_eq!(coordinator.state(), UploadState::FileSelected);
        assert!(coordinator.begin_upload().unwrap().is_none());

        assert!(!coordinator.complete_upload(&pending, Ok(UploadReceipt::default())));
        assert_eq!(coordinator.state(), UploadState::FileSelected);
        assert!(coordinator.begin_upload().unwrap().is_some());
    }

    #[test]
    fn decodes_data_url_preview() {
        let preview = UploadPreview::from_data_url("data:image/jpeg;base64,AQID").expect("preview");
        assert_eq!(preview.mime_type, "image/jpeg");
        assert_eq!(preview.bytes, vec![1, 2, 3]);
        assert!(UploadPreview::from_data_url("data:image/jpeg;base64,***").is_none());
        assert!(UploadPreview::from_data_url("").is_none());
    }
}
