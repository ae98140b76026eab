use serde::{Deserialize, Serialize};

use crate::domain::ExtractionParameters;

pub const UPLOAD_PATH: &str = "upload";
pub const EXTRACT_PATH: &str = "extract";
/// Multipart field carrying the image bytes.
pub const UPLOAD_FIELD: &str = "image";

/// Body of a successful `POST /api/upload`. Every field is optional display sugar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
}

/// Query of `GET /api/extract/`, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractQuery {
    pub colors: u32,
    pub concurrent: bool,
    pub mode: u8,
    pub goroutines: u32,
    pub tolerance: u32,
}

impl ExtractQuery {
    /// Key/value pairs in the order they are written to the query string.
    pub fn pairs(&self) -> [(&'static str, String); 5] {
        [
            ("colors", self.colors.to_string()),
            ("concurrent", self.concurrent.to_string()),
            ("mode", self.mode.to_string()),
            ("goroutines", self.goroutines.to_string()),
            ("tolerance", self.tolerance.to_string()),
        ]
    }
}

impl From<&ExtractionParameters> for ExtractQuery {
    fn from(params: &ExtractionParameters) -> Self {
        Self {
            colors: params.color_count.get(),
            concurrent: params.concurrent,
            mode: params.mode.index(),
            goroutines: params.worker_count.get(),
            tolerance: params.tolerance.get(),
        }
    }
}
