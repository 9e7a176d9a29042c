//! Builders to construct an admission controller from configuration.

use crate::config::{AuditBackendConfig, ControllerConfig};
use crate::core::{AdmissionController, AdmissionError, AdmissionResult, AuditSink, TracingAuditSink};

/// Assembles an [`AdmissionController`] from a [`ControllerConfig`].
pub struct ControllerBuilder {
    config: ControllerConfig,
    audit: Option<Box<dyn AuditSink>>,
}

impl ControllerBuilder {
    /// Start from a configuration.
    #[must_use]
    pub const fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            audit: None,
        }
    }

    /// Configuration being built.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Use this sink instead of the configured audit backend.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Validate the configuration and build the controller.
    ///
    /// # Errors
    /// `InvalidConfig` when validation fails.
    pub fn build(self) -> AdmissionResult<AdmissionController> {
        self.config
            .validate()
            .map_err(|e| AdmissionError::InvalidConfig(format!("config invalid: {e}")))?;

        let controller = AdmissionController::with_capacities(self.config.capacities())?
            .with_policy(self.config.policy)
            .with_evaluation(self.config.evaluation);

        let sink = self.audit.or_else(|| match self.config.audit {
            AuditBackendConfig::Disabled => None,
            AuditBackendConfig::Tracing => Some(Box::new(TracingAuditSink) as Box<dyn AuditSink>),
        });

        tracing::info!(
            capacities = %self.config.capacities(),
            policy = ?self.config.policy,
            evaluation = ?self.config.evaluation,
            audit = sink.is_some(),
            "admission controller built"
        );

        Ok(match sink {
            Some(sink) => controller.with_audit(sink),
            None => controller,
        })
    }
}

/// Build a controller straight from configuration.
///
/// # Errors
/// `InvalidConfig` when validation fails.
pub fn build_controller(cfg: &ControllerConfig) -> AdmissionResult<AdmissionController> {
    ControllerBuilder::new(cfg.clone()).build()
}
