//! Conversions from external infrastructure errors into domain errors.

use kpfdash_domain::DashboardError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DashboardError);

impl From<InfraError> for DashboardError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DashboardError> for InfraError {
    fn from(value: DashboardError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoDashboardError {
    fn into_dashboard(self) -> DashboardError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → DashboardError */
/* -------------------------------------------------------------------------- */

impl IntoDashboardError for HttpError {
    fn into_dashboard(self) -> DashboardError {
        if self.is_timeout() {
            return DashboardError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return DashboardError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return DashboardError::Config(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() {
            return DashboardError::Serialization(format!("failed to decode HTTP body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                429 => DashboardError::Network(message),
                400..=499 => DashboardError::InvalidInput(message),
                _ => DashboardError::Network(message),
            };
        }

        DashboardError::Network(format!("HTTP error: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_dashboard())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
