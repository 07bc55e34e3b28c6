//! Error types for wxgate.
//!
//! Every failure path ends up as a [`WeatherError`]: a closed set of
//! categories whose retryability is fixed by the variant. Messages are
//! built only from typed fields, so raw transport text never reaches a user.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProviderId;

/// Result type alias using `WeatherError`.
pub type Result<T> = std::result::Result<T, WeatherError>;

/// Variant tag of a [`WeatherError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream throttled the request.
    RateLimited,
    /// Upstream unreachable or failing.
    ServiceUnavailable,
    /// A parameter was rejected.
    InvalidInput,
    /// The requested resource does not exist upstream.
    NotFound,
    /// A local precondition failed before any network call.
    Validation,
}

impl ErrorKind {
    /// Whether failures of this kind are worth retrying unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::ServiceUnavailable)
    }

    /// Snake-case tag used in reports and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An actionable pointer attached to an error: a status page or a hint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpReference {
    /// What the user should do or look at.
    pub label: String,
    /// Link, when the reference is a page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl HelpReference {
    /// A reference to a web page.
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: Some(url.into()),
        }
    }

    /// A plain-text hint.
    pub fn hint(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: None,
        }
    }
}

impl fmt::Display for HelpReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{}: {}", self.label, url),
            None => f.write_str(&self.label),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSPORT FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Sanitized cause of a transport-level failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailure {
    /// The remote end refused the connection.
    ConnectionRefused,
    /// The attempt exceeded its timeout.
    Timeout,
    /// The host name could not be resolved.
    NameResolution,
    /// The connection dropped mid-request.
    Connection,
    /// The response arrived but its body could not be decoded.
    MalformedResponse,
}

const REFUSED_SIGNATURES: &[&str] = &["connection refused"];
const TIMEOUT_SIGNATURES: &[&str] = &["timed out", "timeout", "deadline has elapsed"];
const DNS_SIGNATURES: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name resolution",
    "name or service not known",
    "nodename nor servname",
    "no such host",
];
const CONNECTION_SIGNATURES: &[&str] = &["connection reset", "broken pipe", "connection closed"];

impl TransportFailure {
    /// Recognizes a raw error by walking its source chain.
    ///
    /// Returns `None` when no known transient signature is found.
    pub fn classify(error: &(dyn StdError + 'static)) -> Option<Self> {
        let mut current: Option<&(dyn StdError + 'static)> = Some(error);
        while let Some(err) = current {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                if let Some(failure) = Self::from_io_kind(io_err.kind()) {
                    return Some(failure);
                }
            }
            if let Some(failure) = Self::from_message(&err.to_string()) {
                return Some(failure);
            }
            current = err.source();
        }
        None
    }

    fn from_io_kind(kind: io::ErrorKind) -> Option<Self> {
        match kind {
            io::ErrorKind::ConnectionRefused => Some(TransportFailure::ConnectionRefused),
            io::ErrorKind::TimedOut => Some(TransportFailure::Timeout),
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Some(TransportFailure::Connection),
            _ => None,
        }
    }

    fn from_message(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        let matches = |signatures: &[&str]| signatures.iter().any(|s| lower.contains(s));
        if matches(REFUSED_SIGNATURES) {
            Some(TransportFailure::ConnectionRefused)
        } else if matches(DNS_SIGNATURES) {
            Some(TransportFailure::NameResolution)
        } else if matches(TIMEOUT_SIGNATURES) {
            Some(TransportFailure::Timeout)
        } else if matches(CONNECTION_SIGNATURES) {
            Some(TransportFailure::Connection)
        } else {
            None
        }
    }

    /// Sanitized description suitable for user-facing text.
    pub fn describe(self) -> &'static str {
        match self {
            TransportFailure::ConnectionRefused => "the connection was refused",
            TransportFailure::Timeout => "the request timed out",
            TransportFailure::NameResolution => "the host name could not be resolved",
            TransportFailure::Connection => "the connection was interrupted",
            TransportFailure::MalformedResponse => "the response could not be read",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WEATHER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Main error type for all wxgate operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum WeatherError {
    /// Upstream returned 429 or an equivalent throttling signal.
    #[error("{provider} rate limit exceeded{}", fmt_retry_after(.retry_after))]
    RateLimited {
        /// Originating provider
        provider: ProviderId,
        /// Server-suggested wait, when provided
        retry_after: Option<Duration>,
    },

    /// Upstream is unreachable or returned a server error.
    #[error("{provider} is unavailable: {}", fmt_unavailable(.status, .cause))]
    ServiceUnavailable {
        /// Originating provider
        provider: ProviderId,
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Transport-level cause, when no response was received
        cause: Option<TransportFailure>,
    },

    /// A request parameter was rejected.
    #[error("invalid {field} '{value}' for {provider}: {reason}")]
    InvalidInput {
        /// Originating provider
        provider: ProviderId,
        /// Offending parameter
        field: String,
        /// Offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The requested resource does not exist upstream.
    #[error("{resource} not found at {provider}")]
    NotFound {
        /// Originating provider
        provider: ProviderId,
        /// What was looked up
        resource: String,
    },

    /// A local precondition failed.
    #[error("validation failed for {provider}: {reason}")]
    Validation {
        /// Provider the request was meant for
        provider: ProviderId,
        /// Which precondition failed
        reason: String,
    },
}

fn fmt_retry_after(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

fn fmt_unavailable(status: &Option<u16>, cause: &Option<TransportFailure>) -> String {
    match (status, cause) {
        (_, Some(cause)) => cause.describe().to_string(),
        (Some(status), None) => format!("HTTP {status}"),
        (None, None) => "no response".to_string(),
    }
}

impl WeatherError {
    // ───────────────────────────────────────────────────────────────────────────
    // Constructors
    // ───────────────────────────────────────────────────────────────────────────

    /// Throttled by upstream.
    pub fn rate_limited(provider: ProviderId, retry_after: Option<Duration>) -> Self {
        WeatherError::RateLimited {
            provider,
            retry_after,
        }
    }

    /// Upstream answered with a server-side failure status.
    pub fn upstream_status(provider: ProviderId, status: u16) -> Self {
        WeatherError::ServiceUnavailable {
            provider,
            status: Some(status),
            cause: None,
        }
    }

    /// No usable response because of a transport failure.
    pub fn transport(provider: ProviderId, cause: TransportFailure) -> Self {
        WeatherError::ServiceUnavailable {
            provider,
            status: None,
            cause: Some(cause),
        }
    }

    /// A parameter was rejected.
    pub fn invalid_input(
        provider: ProviderId,
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        WeatherError::InvalidInput {
            provider,
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// The resource does not exist upstream.
    pub fn not_found(provider: ProviderId, resource: impl Into<String>) -> Self {
        WeatherError::NotFound {
            provider,
            resource: resource.into(),
        }
    }

    /// A local precondition failed.
    pub fn validation(provider: ProviderId, reason: impl Into<String>) -> Self {
        WeatherError::Validation {
            provider,
            reason: reason.into(),
        }
    }

    /// Maps a non-success HTTP status onto the taxonomy.
    ///
    /// `context` names what was requested and is used for `NotFound` and
    /// `InvalidInput` details.
    pub fn from_status(
        provider: ProviderId,
        status: u16,
        retry_after: Option<Duration>,
        context: &str,
    ) -> Self {
        match status {
            429 => Self::rate_limited(provider, retry_after),
            404 => Self::not_found(provider, context),
            400..=499 => Self::invalid_input(
                provider,
                "request",
                context,
                format!("rejected with HTTP {status}"),
            ),
            _ => Self::upstream_status(provider, status),
        }
    }

    /// Translates an untyped transport error into the taxonomy.
    ///
    /// Recognized transient failures become `ServiceUnavailable`. Anything
    /// else becomes a non-retryable `Validation` error, so an unknown
    /// failure is never retried.
    pub fn from_transport_error(provider: ProviderId, error: &(dyn StdError + 'static)) -> Self {
        match TransportFailure::classify(error) {
            Some(cause) => Self::transport(provider, cause),
            None => Self::validation(provider, "the request failed before reaching the provider"),
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────────────────

    /// Variant tag.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::RateLimited { .. } => ErrorKind::RateLimited,
            WeatherError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            WeatherError::InvalidInput { .. } => ErrorKind::InvalidInput,
            WeatherError::NotFound { .. } => ErrorKind::NotFound,
            WeatherError::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// Originating provider.
    pub fn provider(&self) -> ProviderId {
        match self {
            WeatherError::RateLimited { provider, .. }
            | WeatherError::ServiceUnavailable { provider, .. }
            | WeatherError::InvalidInput { provider, .. }
            | WeatherError::NotFound { provider, .. }
            | WeatherError::Validation { provider, .. } => *provider,
        }
    }

    /// Returns true if retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// HTTP status associated with the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WeatherError::RateLimited { .. } => Some(429),
            WeatherError::ServiceUnavailable { status, .. } => *status,
            WeatherError::InvalidInput { .. } => Some(400),
            WeatherError::NotFound { .. } => Some(404),
            WeatherError::Validation { .. } => None,
        }
    }

    /// Server-suggested wait before retrying, for rate limits.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            WeatherError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Technical message (same as `Display`).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Message intended for the end user.
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::RateLimited {
                provider,
                retry_after,
            } => {
                let wait = match retry_after {
                    Some(d) => format!("about {} seconds", d.as_secs().max(1)),
                    None => "a minute".to_string(),
                };
                format!(
                    "{} is receiving too many requests right now. \
                     Please wait {wait} and try again.",
                    provider.display_name()
                )
            }
            WeatherError::ServiceUnavailable { provider, .. } => format!(
                "{} is temporarily unavailable ({}). Please try again in a few minutes.",
                provider.display_name(),
                self.unavailable_detail()
            ),
            WeatherError::InvalidInput {
                field,
                value,
                reason,
                ..
            } => format!("The {field} value '{value}' was not accepted: {reason}."),
            WeatherError::NotFound { provider, resource } => format!(
                "No data was found for {resource} at {}.",
                provider.display_name()
            ),
            WeatherError::Validation { reason, .. } => {
                format!("The request could not be processed: {reason}.")
            }
        }
    }

    fn unavailable_detail(&self) -> String {
        match self {
            WeatherError::ServiceUnavailable { status, cause, .. } => {
                fmt_unavailable(status, cause)
            }
            _ => String::new(),
        }
    }

    /// Actionable references for the user: status pages and parameter hints.
    pub fn help_references(&self) -> Vec<HelpReference> {
        let provider = self.provider();
        let status_page = HelpReference::link(
            format!("{} status and documentation", provider.display_name()),
            provider.status_url(),
        );
        match self {
            WeatherError::RateLimited { .. } | WeatherError::ServiceUnavailable { .. } => {
                vec![status_page]
            }
            WeatherError::InvalidInput { field, .. } => vec![
                HelpReference::hint(format!("Check the '{field}' parameter and try again")),
                status_page,
            ],
            WeatherError::NotFound { .. } => match provider {
                ProviderId::Noaa => vec![HelpReference::hint(NOAA_COVERAGE_HINT), status_page],
                ProviderId::OpenMeteo => vec![status_page],
            },
            WeatherError::Validation { .. } => vec![
                HelpReference::hint("Adjust the request parameters and try again"),
                status_page,
            ],
        }
    }

    /// Serializable user-facing rendering of this error.
    pub fn report(&self) -> ErrorReport {
        ErrorReport::from(self)
    }
}

const NOAA_COVERAGE_HINT: &str =
    "NOAA covers the United States and its territories; use Open-Meteo for other locations";

/// Single retryability predicate for typed and untyped errors.
///
/// Typed errors answer from their variant, so every transport failure wrapped
/// in [`WeatherError::ServiceUnavailable`] retries. Untyped errors are
/// retryable only when [`TransportFailure::classify`] recognizes them.
pub fn is_retryable(error: &(dyn StdError + 'static)) -> bool {
    if let Some(typed) = error.downcast_ref::<WeatherError>() {
        return typed.is_retryable();
    }
    TransportFailure::classify(error).is_some()
}

// ═══════════════════════════════════════════════════════════════════════════════
// USER-FACING REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Structured, pre-sanitized description of a terminal failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error category
    pub kind: ErrorKind,
    /// Originating provider
    pub provider: ProviderId,
    /// Message for the end user
    pub message: String,
    /// Status pages and hints
    pub help: Vec<HelpReference>,
    /// Whether the caller may re-invoke later
    pub retryable: bool,
    /// HTTP status, when one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl From<&WeatherError> for ErrorReport {
    fn from(err: &WeatherError) -> Self {
        Self {
            kind: err.kind(),
            provider: err.provider(),
            message: err.user_message(),
            help: err.help_references(),
            retryable: err.is_retryable(),
            status_code: err.status_code(),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error ({}): {}", self.kind, self.message)?;
        for reference in &self.help {
            writeln!(f, "  - {reference}")?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value could not be parsed or is out of range.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        /// Setting name (usually the environment variable)
        name: String,
        /// Raw value supplied
        value: String,
        /// Why it was rejected
        reason: String,
    },
}
