//! Ordered transport construction with fallbacks.
//!
//! The factory is consulted fresh for every request execution; nothing is
//! cached between calls.

use std::fmt;

use tracing::debug;

use super::native::{NativeTransport, ProxyMode};
use super::{Transport, TransportError};

type Constructor = Box<dyn Fn() -> Result<Box<dyn Transport>, TransportError> + Send + Sync>;

/// Named constructors tried in registration order.
pub struct TransportFactory {
    constructors: Vec<(&'static str, Constructor)>,
}

impl fmt::Debug for TransportFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportFactory")
            .field("backends", &self.backend_names())
            .finish()
    }
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self::native()
    }
}

impl TransportFactory {
    /// Creates a factory with no constructors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            constructors: Vec::new(),
        }
    }

    /// The standard chain: system proxy discovery first, then the env-proxy
    /// and direct fallbacks.
    #[must_use]
    pub fn native() -> Self {
        Self::new()
            .with_constructor("native", || {
                NativeTransport::new(ProxyMode::System).map(|t| Box::new(t) as Box<dyn Transport>)
            })
            .with_constructor("env-proxy", || {
                NativeTransport::new(ProxyMode::Environment)
                    .map(|t| Box::new(t) as Box<dyn Transport>)
            })
            .with_constructor("direct", || {
                NativeTransport::new(ProxyMode::Disabled).map(|t| Box::new(t) as Box<dyn Transport>)
            })
    }

    /// Appends a constructor to the chain.
    #[must_use]
    pub fn with_constructor<F>(mut self, name: &'static str, constructor: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Transport>, TransportError> + Send + Sync + 'static,
    {
        self.constructors.push((name, Box::new(constructor)));
        self
    }

    #[must_use]
    pub fn backend_names(&self) -> Vec<&'static str> {
        self.constructors.iter().map(|(name, _)| *name).collect()
    }

    /// Returns the first transport that constructs successfully.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] when every constructor fails.
    pub fn create_transport(&self) -> Result<Box<dyn Transport>, TransportError> {
        for (name, constructor) in &self.constructors {
            match constructor() {
                Ok(transport) => {
                    debug!(backend = name, "transport created");
                    return Ok(transport);
                }
                Err(error) => debug!(backend = name, error = %error, "transport backend failed"),
            }
        }
        Err(TransportError::unavailable(self.backend_names()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn failing(
        backend: &'static str,
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> Result<Box<dyn Transport>, TransportError> + Send + Sync {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::construct(backend, "not available here"))
        }
    }

    #[test]
    fn test_empty_factory_is_unavailable() {
        let error = TransportFactory::new().create_transport().err().unwrap();
        assert!(matches!(
            error,
            TransportError::Unavailable { ref attempted } if attempted.is_empty()
        ));
    }

    #[test]
    fn test_all_failing_constructors_are_tried_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = TransportFactory::new()
            .with_constructor("first", failing("first", calls.clone()))
            .with_constructor("second", failing("second", calls.clone()))
            .with_constructor("third", failing("third", calls.clone()));

        let error = factory.create_transport().err().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match error {
            TransportError::Unavailable { attempted } => {
                assert_eq!(attempted, vec!["first", "second", "third"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_native_chain_outside_runtime_is_unavailable() {
        let factory = TransportFactory::native();
        assert_eq!(factory.backend_names(), vec!["native", "env-proxy", "direct"]);
        assert!(matches!(
            factory.create_transport(),
            Err(TransportError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_native_chain_inside_runtime_returns_transport() {
        let transport = TransportFactory::native().create_transport().unwrap();
        assert_eq!(transport.name(), "native");
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = TransportFactory::new()
            .with_constructor("broken", failing("broken", calls.clone()))
            .with_constructor("direct", || {
                NativeTransport::new(ProxyMode::Disabled).map(|t| Box::new(t) as Box<dyn Transport>)
            })
            .with_constructor("never", failing("never", calls.clone()));

        let transport = factory.create_transport().unwrap();
        assert_eq!(transport.name(), "direct");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
