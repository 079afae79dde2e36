//! Playback analysis graph
//!
//! Routes the audible element's samples through an analyser. A graph is
//! bound to exactly one (element, source) pair at a time; rebinding requires
//! an explicit disconnect first.

use super::analyzer::{Analyser, AnalyserConfig, TapSlot};
use super::element::{ElementId, MediaElement};

#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The element has no source assigned
    NoSource,
    /// Already connected to another element or source
    AlreadyBound { element: ElementId, source: String },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::NoSource => write!(f, "Element has no source"),
            GraphError::AlreadyBound { element, source } => write!(
                f,
                "Graph already bound to element {:?} ({}), disconnect first",
                element, source
            ),
        }
    }
}

impl std::error::Error for GraphError {}

struct Binding {
    element: ElementId,
    source: String,
    tap: TapSlot,
}

pub struct PlaybackGraph {
    analyser: Analyser,
    binding: Option<Binding>,
}

impl PlaybackGraph {
    pub fn new(config: AnalyserConfig) -> Self {
        Self {
            analyser: Analyser::new(config),
            binding: None,
        }
    }

    pub fn analyser(&self) -> &Analyser {
        &self.analyser
    }

    #[cfg(test)]
    pub fn is_connected(&self) -> bool {
        self.binding.is_some()
    }

    /// Bound to exactly this element and its current source
    pub fn is_bound_to(&self, element: &dyn MediaElement) -> bool {
        match (&self.binding, element.source_url()) {
            (Some(b), Some(url)) => b.element == element.id() && b.source == url,
            _ => false,
        }
    }

    /// Connect the element's tap; a no-op if already bound to it
    pub fn connect(&mut self, element: &dyn MediaElement) -> Result<(), GraphError> {
        let source = element.source_url().ok_or(GraphError::NoSource)?;

        if let Some(binding) = &self.binding {
            if binding.element == element.id() && binding.source == source {
                return Ok(());
            }
            return Err(GraphError::AlreadyBound {
                element: binding.element,
                source: binding.source.clone(),
            });
        }

        self.analyser.reset();
        let tap = element.tap();
        *tap.lock() = Some(self.analyser.clone());
        self.binding = Some(Binding {
            element: element.id(),
            source: source.to_string(),
            tap,
        });
        tracing::debug!("Playback graph connected to {}", source);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(binding) = self.binding.take() {
            *binding.tap.lock() = None;
            tracing::debug!("Playback graph disconnected from {}", binding.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::element::PreparedMedia;
    use crate::audio::testing::{FakeElement, tone_wav};
    use std::sync::Arc;
    use std::time::Duration;

    fn media() -> PreparedMedia {
        PreparedMedia::open_decoder(Arc::from(tone_wav(0.1))).unwrap()
    }

    fn loaded(url: &str) -> FakeElement {
        let mut element = FakeElement::new(Duration::from_secs(10));
        element.load(url, media()).unwrap();
        element
    }

    #[test]
    fn test_connect_requires_source() {
        let mut graph = PlaybackGraph::new(AnalyserConfig::default());
        let element = FakeElement::new(Duration::from_secs(1));
        assert_eq!(graph.connect(&element), Err(GraphError::NoSource));
        assert!(!graph.is_connected());
    }

    #[test]
    fn test_connect_installs_tap_and_is_idempotent() {
        let mut graph = PlaybackGraph::new(AnalyserConfig::default());
        let element = loaded("/a.wav");
        graph.connect(&element).unwrap();
        assert!(element.is_tapped());
        assert!(graph.is_bound_to(&element));
        assert!(graph.connect(&element).is_ok());
    }

    #[test]
    fn test_second_binding_is_refused() {
        let mut graph = PlaybackGraph::new(AnalyserConfig::default());
        let first = loaded("/a.wav");
        let second = loaded("/b.wav");
        graph.connect(&first).unwrap();

        let err = graph.connect(&second).unwrap_err();
        assert!(matches!(err, GraphError::AlreadyBound { ref source, .. } if source == "/a.wav"));
        assert!(!second.is_tapped());
    }

    #[test]
    fn test_new_source_on_same_element_needs_disconnect() {
        let mut graph = PlaybackGraph::new(AnalyserConfig::default());
        let mut element = loaded("/a.wav");
        graph.connect(&element).unwrap();

        element.load("/b.wav", media()).unwrap();
        assert!(!graph.is_bound_to(&element));
        assert!(graph.connect(&element).is_err());

        graph.disconnect();
        assert!(!element.is_tapped());
        graph.connect(&element).unwrap();
        assert!(graph.is_bound_to(&element));
    }
}
