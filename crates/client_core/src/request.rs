//! Extraction parameter ownership, clamping, and request serialization.

use std::str::FromStr;

use shared::{
    domain::{ColorCount, ExtractionMode, ExtractionParameters, Tolerance, WorkerCount},
    error::ParameterError,
    protocol::{ExtractQuery, EXTRACT_PATH, UPLOAD_PATH},
};
use url::Url;

use crate::{error::ClientError, upload::UploadState};

/// A fully-qualified extraction query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    url: Url,
    parameters: ExtractionParameters,
}

impl ExtractionRequest {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn query_string(&self) -> &str {
        self.url.query().unwrap_or_default()
    }

    pub fn parameters(&self) -> &ExtractionParameters {
        &self.parameters
    }
}

/// Parameter a text widget edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterField {
    ColorCount,
    Mode,
    Concurrent,
    WorkerCount,
    Tolerance,
}

impl ParameterField {
    fn name(self) -> &'static str {
        match self {
            ParameterField::ColorCount => "colors",
            ParameterField::Mode => "mode",
            ParameterField::Concurrent => "concurrent",
            ParameterField::WorkerCount => "goroutines",
            ParameterField::Tolerance => "tolerance",
        }
    }
}

impl FromStr for ParameterField {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "colors" | "color_count" => Ok(ParameterField::ColorCount),
            "mode" => Ok(ParameterField::Mode),
            "concurrent" => Ok(ParameterField::Concurrent),
            "goroutines" | "workers" | "worker_count" => Ok(ParameterField::WorkerCount),
            "tolerance" => Ok(ParameterField::Tolerance),
            other => Err(ParameterError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionRequestBuilder {
    service_url: Url,
    params: ExtractionParameters,
}

impl ExtractionRequestBuilder {
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            params: ExtractionParameters::default(),
        }
    }

    pub fn parameters(&self) -> &ExtractionParameters {
        &self.params
    }

    pub fn set_color_count(&mut self, n: i64) {
        self.params.color_count = ColorCount::clamped(n);
    }

    pub fn set_mode(&mut self, mode: ExtractionMode) {
        self.params.mode = mode;
    }

    pub fn set_concurrent(&mut self, concurrent: bool) {
        self.params.concurrent = concurrent;
    }

    pub fn set_worker_count(&mut self, n: i64) {
        self.params.worker_count = WorkerCount::clamped(n);
    }

    pub fn set_tolerance(&mut self, n: i64) {
        self.params.tolerance = Tolerance::clamped(n);
    }

    /// Applies raw widget text. Numbers are clamped; unparseable text leaves
    /// the stored value untouched and is reported.
    pub fn apply_input(&mut self, field: ParameterField, raw: &str) -> Result<(), ParameterError> {
        let raw = raw.trim();
        let invalid = || ParameterError::InvalidValue {
            field: field.name(),
            value: raw.to_string(),
        };
        match field {
            ParameterField::Mode => self.set_mode(raw.parse()?),
            ParameterField::Concurrent => {
                let concurrent = match raw.to_ascii_lowercase().as_str() {
                    "true" | "1" | "on" | "concurrent" => true,
                    "false" | "0" | "off" | "sequential" => false,
                    _ => return Err(invalid()),
                };
                self.set_concurrent(concurrent);
            }
            ParameterField::ColorCount | ParameterField::WorkerCount | ParameterField::Tolerance => {
                let n = parse_widget_number(raw).ok_or_else(invalid)?;
                match field {
                    ParameterField::ColorCount => self.set_color_count(n),
                    ParameterField::WorkerCount => self.set_worker_count(n),
                    _ => self.set_tolerance(n),
                }
            }
        }
        Ok(())
    }

    /// Builds the query for the current parameters. All five parameters are
    /// always present; the service ignores the ones the mode does not use.
    pub fn build_request(&self, upload_state: UploadState) -> Result<ExtractionRequest, ClientError> {
        if upload_state != UploadState::Uploaded {
            return Err(ClientError::NotUploaded);
        }

        let mut url = endpoint_url(&self.service_url, &[EXTRACT_PATH, ""])?;
        url.query_pairs_mut()
            .clear()
            .extend_pairs(ExtractQuery::from(&self.params).pairs());
        Ok(ExtractionRequest {
            url,
            parameters: self.params,
        })
    }

    pub fn upload_url(&self) -> Result<Url, ClientError> {
        endpoint_url(&self.service_url, &[UPLOAD_PATH])
    }
}

/// Numeric widgets may hand over text such as `"12"`, `"12.7"` or `"1e3"`.
fn parse_widget_number(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let n = raw.parse::<f64>().ok()?;
    if n.is_nan() {
        return None;
    }
    // Saturating cast; clamping happens in the setter.
    Some(n.trunc() as i64)
}

pub(crate) fn endpoint_url(service_url: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = service_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidServiceUrl {
            url: service_url.to_string(),
            reason: "url cannot carry a path".into(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ExtractionRequestBuilder {
        ExtractionRequestBuilder::new(Url::parse("http://localhost:8080/api").unwrap())
    }

    #[test]
    fn setters_clamp_instead_of_rejecting() {
        let mut b = builder();
        for (input, expected) in [(-1, 3), (0, 3), (2, 3), (101, 100), (1_000_000, 100)] {
            b.set_color_count(input);
            assert_eq!(b.parameters().color_count.get(), expected, "input {input}");
        }
        b.set_worker_count(1);
        assert_eq!(b.parameters().worker_count.get(), 4);
        b.set_worker_count(500);
        assert_eq!(b.parameters().worker_count.get(), 100);
        b.set_tolerance(0);
        assert_eq!(b.parameters().tolerance.get(), 15);
        b.set_tolerance(9999);
        assert_eq!(b.parameters().tolerance.get(), 440);
    }

    #[test]
    fn build_requires_uploaded_state() {
        let b = builder();
        for state in [
            UploadState::Idle,
            UploadState::FileSelected,
            UploadState::Uploading,
            UploadState::UploadFailed,
        ] {
            assert_eq!(b.build_request(state).unwrap_err(), ClientError::NotUploaded);
        }
        assert!(b.build_request(UploadState::Uploaded).is_ok());
    }

    #[test]
    fn builds_default_query_against_extract_endpoint() {
        let request = builder().build_request(UploadState::Uploaded).unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8080/api/extract/?colors=3&concurrent=false&mode=0&goroutines=4&tolerance=15"
        );
    }

    #[test]
    fn repeated_builds_are_identical() {
        let mut b = builder();
        b.set_color_count(12);
        b.set_concurrent(true);
        let first = b.build_request(UploadState::Uploaded).unwrap();
        let second = b.build_request(UploadState::Uploaded).unwrap();
        assert_eq!(first.query_string(), second.query_string());
        assert_eq!(first, second);
    }

    #[test]
    fn sequential_request_still_carries_worker_count() {
        let mut b = builder();
        b.set_concurrent(false);
        b.set_worker_count(32);
        let request = b.build_request(UploadState::Uploaded).unwrap();
        assert!(request.query_string().contains("concurrent=false"));
        assert!(request.query_string().contains("goroutines=32"));
    }

    #[test]
    fn later_edits_do_not_touch_built_request() {
        let mut b = builder();
        let request = b.build_request(UploadState::Uploaded).unwrap();
        b.set_color_count(50);
        assert!(request.query_string().starts_with("colors=3&"));
        assert_eq!(request.parameters().color_count.get(), 3);
    }

    #[test]
    fn handles_trailing_slash_and_query_on_service_url() {
        let b = ExtractionRequestBuilder::new(Url::parse("https://svc.example/api/?x=1").unwrap());
        assert_eq!(b.upload_url().unwrap().as_str(), "https://svc.example/api/upload");
        let request = b.build_request(UploadState::Uploaded).unwrap();
        assert!(request
            .url()
            .as_str()
            .starts_with("https://svc.example/api/extract/?colors="));
    }

    #[test]
    fn widget_text_is_parsed_and_clamped() {
        let mut b = builder();
        b.apply_input(ParameterField::Tolerance, "1000").unwrap();
        assert_eq!(b.parameters().tolerance.get(), 440);
        b.apply_input(ParameterField::ColorCount, " 12.9 ").unwrap();
        assert_eq!(b.parameters().color_count.get(), 12);
        b.apply_input(ParameterField::Concurrent, "concurrent").unwrap();
        assert!(b.parameters().concurrent);
        b.apply_input(ParameterField::Mode, "1").unwrap();
        assert_eq!(b.parameters().mode, ExtractionMode::ToleranceMerge);
    }

    #[test]
    fn unparseable_widget_text_keeps_previous_value() {
        let mut b = builder();
        b.set_worker_count(8);
        let err = b.apply_input(ParameterField::WorkerCount, "lots").unwrap_err();
        assert!(matches!(err, ParameterError::InvalidValue { field: "goroutines", .. }));
        assert_eq!(b.parameters().worker_count.get(), 8);
        assert!(b.apply_input(ParameterField::Mode, "9").is_err());
        assert_eq!(b.parameters().mode, ExtractionMode::MedianCut);
    }

    #[test]
    fn parses_field_names() {
        assert_eq!("goroutines".parse::<ParameterField>().unwrap(), ParameterField::WorkerCount);
        assert!("speed".parse::<ParameterField>().is_err());
    }
}
