//! Passive health checking (outcome recording).
//!
//! # Responsibilities
//! - Receive the outcome of every completed backend round trip
//! - Classify it as success or failure
//! - Feed the endpoint registry
//!
//! # Design Decisions
//! - Transport failures (connect, reset, timeout) are always failures
//! - Whether a status code counts is up to the configured classifier
//! - Recording never blocks and never fails

use std::sync::Arc;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::health::endpoint::Endpoint;
use crate::health::registry::EndpointRegistry;
use crate::observability::metrics;

/// What happened on one backend round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The backend answered with this status.
    Response(StatusCode),
    /// No response: connection error, reset, or timeout.
    TransportFailure,
}

/// Decides which outcomes count as failures for health accounting.
pub trait OutcomeClassifier: Send + Sync + std::fmt::Debug {
    fn is_success(&self, outcome: &Outcome) -> bool;
}

/// Only transport failures count.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransportOnly;

impl OutcomeClassifier for TransportOnly {
    fn is_success(&self, outcome: &Outcome) -> bool {
        matches!(outcome, Outcome::Response(_))
    }
}

/// Transport failures plus gateway-style 5xx responses (502, 503, 504).
#[derive(Debug, Default, Clone, Copy)]
pub struct ServerErrors;

impl OutcomeClassifier for ServerErrors {
    fn is_success(&self, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Response(status) => !matches!(
                *status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            ),
            Outcome::TransportFailure => false,
        }
    }
}

/// Classifier selection in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClassification {
    #[default]
    Transport,
    ServerErrors,
}

impl FailureClassification {
    pub fn classifier(self) -> Arc<dyn OutcomeClassifier> {
        match self {
            FailureClassification::Transport => Arc::new(TransportOnly),
            FailureClassification::ServerErrors => Arc::new(ServerErrors),
        }
    }
}

/// Write-side entry point called after each backend round trip.
#[derive(Debug, Clone)]
pub struct OutcomeRecorder {
    registry: Arc<EndpointRegistry>,
    classifier: Arc<dyn OutcomeClassifier>,
}

impl OutcomeRecorder {
    pub fn new(registry: Arc<EndpointRegistry>, classifier: Arc<dyn OutcomeClassifier>) -> Self {
        Self {
            registry,
            classifier,
        }
    }

    /// Record the outcome of one round trip to `endpoint`.
    pub fn record(&self, endpoint: &Endpoint, outcome: &Outcome) {
        let success = self.classifier.is_success(outcome);
        if !success {
            tracing::trace!(endpoint = %endpoint, outcome = ?outcome, "Round trip counted as failure");
        }
        metrics::record_outcome(endpoint.as_str(), success);
        self.registry.record_outcome(endpoint, success);
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::registry::RegistryOptions;
    use crate::health::window::WindowCounts;
    use std::time::Duration;

    fn registry() -> Arc<EndpointRegistry> {
        EndpointRegistry::new(RegistryOptions {
            enabled: true,
            stats_reset_period: Duration::from_secs(1),
            min_requests: 1,
            max_drop_probability: 1.0,
        })
        .unwrap()
    }

    #[test]
    fn test_transport_only() {
        let c = TransportOnly;
        assert!(c.is_success(&Outcome::Response(StatusCode::OK)));
        assert!(c.is_success(&Outcome::Response(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!c.is_success(&Outcome::TransportFailure));
    }

    #[test]
    fn test_server_errors() {
        let c = ServerErrors;
        assert!(c.is_success(&Outcome::Response(StatusCode::OK)));
        assert!(c.is_success(&Outcome::Response(StatusCode::NOT_FOUND)));
        // Application errors are not gateway failures
        assert!(c.is_success(&Outcome::Response(StatusCode::INTERNAL_SERVER_ERROR)));
        assert!(!c.is_success(&Outcome::Response(StatusCode::BAD_GATEWAY)));
        assert!(!c.is_success(&Outcome::Response(StatusCode::GATEWAY_TIMEOUT)));
        assert!(!c.is_success(&Outcome::TransportFailure));
    }

    #[test]
    fn test_recorder_feeds_registry() {
        let registry = registry();
        let recorder = OutcomeRecorder::new(registry.clone(), FailureClassification::Transport.classifier());
        let ep = Endpoint::from("127.0.0.1:3000");

        recorder.record(&ep, &Outcome::Response(StatusCode::OK));
        recorder.record(&ep, &Outcome::Response(StatusCode::SERVICE_UNAVAILABLE));
        recorder.record(&ep, &Outcome::TransportFailure);

        assert_eq!(registry.window(&ep), Some(WindowCounts { total: 3, failed: 1 }));
    }

    #[test]
    fn test_custom_classifier() {
        #[derive(Debug)]
        struct AnyNonSuccess;
        impl OutcomeClassifier for AnyNonSuccess {
            fn is_success(&self, outcome: &Outcome) -> bool {
                matches!(outcome, Outcome::Response(s) if s.is_success())
            }
        }

        let registry = registry();
        let recorder = OutcomeRecorder::new(registry.clone(), Arc::new(AnyNonSuccess));
        let ep = Endpoint::from("127.0.0.1:3000");

        recorder.record(&ep, &Outcome::Response(StatusCode::NOT_FOUND));
        recorder.record(&ep, &Outcome::Response(StatusCode::OK));

        assert_eq!(registry.window(&ep), Some(WindowCounts { total: 2, failed: 1 }));
    }

    #[test]
    fn test_classification_from_config() {
        #[derive(Deserialize)]
        struct Section {
            failure_classification: FailureClassification,
        }

        let section: Section = toml::from_str("failure_classification = \"server_errors\"").unwrap();
        let parsed = section.failure_classification;
        assert_eq!(parsed, FailureClassification::ServerErrors);
        assert_eq!(FailureClassification::default(), FailureClassification::Transport);
    }
}
