//! Palette request lifecycle and its rendering.

use shared::domain::{Palette, PaletteEntry};
use tracing::{debug, info, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestLifecycle {
    #[default]
    NotStarted,
    Pending,
    Succeeded(Palette),
    Failed(ClientError),
}

/// What the palette area shows for the current lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteRender<'a> {
    Empty,
    Loading,
    Palette(&'a [PaletteEntry]),
    Error(&'a ClientError),
}

#[derive(Debug, Default)]
pub struct PaletteView {
    lifecycle: RequestLifecycle,
}

impl PaletteView {
    pub fn lifecycle(&self) -> &RequestLifecycle {
        &self.lifecycle
    }

    pub fn is_pending(&self) -> bool {
        self.lifecycle == RequestLifecycle::Pending
    }

    pub fn palette(&self) -> Option<&Palette> {
        match &self.lifecycle {
            RequestLifecycle::Succeeded(palette) => Some(palette),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match &self.lifecycle {
            RequestLifecycle::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Moves to `Pending`. Returns `false` if a request is already pending.
    pub(crate) fn begin(&mut self) -> bool {
        if self.is_pending() {
            debug!("palette extraction already pending; dropping request");
            return false;
        }
        self.lifecycle = RequestLifecycle::Pending;
        true
    }

    pub(crate) fn resolve(&mut self, result: Result<Palette, ClientError>) {
        self.lifecycle = match result {
            Ok(palette) => {
                info!(colors = palette.len(), "palette extracted");
                RequestLifecycle::Succeeded(palette)
            }
            Err(error) => {
                warn!(%error, "palette extraction failed");
                RequestLifecycle::Failed(error)
            }
        };
    }

    /// Drops a pending request without recording an outcome.
    pub(crate) fn discard(&mut self) {
        self.lifecycle = RequestLifecycle::NotStarted;
    }

    pub fn render(&self) -> PaletteRender<'_> {
        match &self.lifecycle {
            RequestLifecycle::NotStarted => PaletteRender::Empty,
            RequestLifecycle::Pending => PaletteRender::Loading,
            RequestLifecycle::Succeeded(palette) => PaletteRender::Palette(palette.entries()),
            RequestLifecycle::Failed(error) => PaletteRender::Error(error),
        }
    }

    /// Plain-text rendering, one line per palette entry.
    pub fn render_lines(&self) -> Vec<String> {
        match self.render() {
            PaletteRender::Empty => Vec::new(),
            PaletteRender::Loading => vec!["Loading...".to_string()],
            PaletteRender::Palette(entries) => entries
                .iter()
                .map(|entry| format!("{}: {}", entry.color, entry.frequency))
                .collect(),
            PaletteRender::Error(error) => vec![format!("Palette extraction failed: {error}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportFailure;

    fn palette() -> Palette {
        Palette::new(vec![
            PaletteEntry::new("#FF0000", 12),
            PaletteEntry::new("#00FF00", 5),
        ])
    }

    #[test]
    fn pending_renders_loading_not_previous_palette() {
        let mut view = PaletteView::default();
        assert!(view.begin());
        view.resolve(Ok(palette()));
        assert!(view.begin());
        assert_eq!(view.render(), PaletteRender::Loading);
        assert_eq!(view.render_lines(), vec!["Loading...".to_string()]);
        assert!(view.palette().is_none());
    }

    #[test]
    fn begin_while_pending_is_refused() {
        let mut view = PaletteView::default();
        assert!(view.begin());
        assert!(!view.begin());
    }

    #[test]
    fn failure_is_distinguishable_from_not_started() {
        let mut view = PaletteView::default();
        assert_eq!(view.render(), PaletteRender::Empty);
        view.begin();
        view.resolve(Err(ClientError::ExtractionTransport(TransportFailure::Status(500))));
        assert!(matches!(view.render(), PaletteRender::Error(_)));
        assert!(view.error().is_some());
    }

    #[test]
    fn success_replaces_palette_wholesale() {
        let mut view = PaletteView::default();
        view.begin();
        view.resolve(Ok(palette()));
        view.begin();
        view.resolve(Ok(Palette::new(vec![PaletteEntry::new("#0000FF", 1)])));
        assert_eq!(view.render_lines(), vec!["#0000FF: 1".to_string()]);
    }
}
