/*!
 * Error types for the epubtl library.
 *
 * This module contains custom error types for the different layers of the
 * translation pipeline, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: remote translation API failures, normalized across providers
 * - `EpubError`: archive and markup failures
 * - `TranslationError`: everything a translation run can fail with
 * - `JobSlotError`: caller-side conflicts between concurrent runs
 */

use thiserror::Error;

/// Stable classification of every error a translation run can surface.
///
/// The codes are meant for programmatic handling by callers (retry policy,
/// UI hints), while the `Display` output of the error itself is meant for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingProvider,
    MissingApiKey,
    MissingModel,
    DecryptionError,
    EpubLoadError,
    EmptyEpub,
    InvalidApiKey,
    RateLimit,
    InvalidRequest,
    NetworkError,
    ApiError,
    Unknown,
    TooManyFailures,
    NoSectionsTranslated,
    Cancelled,
}

impl ErrorKind {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingProvider => "MISSING_PROVIDER",
            Self::MissingApiKey => "MISSING_API_KEY",
            Self::MissingModel => "MISSING_MODEL",
            Self::DecryptionError => "DECRYPTION_ERROR",
            Self::EpubLoadError => "EPUB_LOAD_ERROR",
            Self::EmptyEpub => "EMPTY_EPUB",
            Self::InvalidApiKey => "INVALID_API_KEY",
            Self::RateLimit => "RATE_LIMIT",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ApiError => "API_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
            Self::TooManyFailures => "TOO_MANY_FAILURES",
            Self::NoSectionsTranslated => "NO_SECTIONS_TRANSLATED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors that can occur when calling a translation provider API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The API rejected the credentials (HTTP 401)
    #[error("Invalid API token. Please check your {provider} API key.")]
    InvalidApiKey {
        /// Display name of the provider that rejected the key
        provider: String,
    },

    /// The API is throttling requests (HTTP 429)
    #[error("Rate limit exceeded. Please try again in a few moments.")]
    RateLimit,

    /// The API refused the request as malformed (HTTP 400)
    #[error("Invalid request: {0}. Please check your model selection.")]
    InvalidRequest(String),

    /// The request never produced an HTTP response
    #[error("Network error. Please check your internet connection. ({0})")]
    NetworkError(String),

    /// Any other non-2xx status
    #[error("API error ({status_code}): {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Anything that does not fit the categories above, such as an unreadable response body
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and its body onto the shared taxonomy
    pub fn from_status(provider: &str, status_code: u16, body: &str) -> Self {
        let message = extract_error_message(body);
        match status_code {
            401 => Self::InvalidApiKey {
                provider: provider.to_string(),
            },
            429 => Self::RateLimit,
            400 => Self::InvalidRequest(message),
            _ => Self::ApiError {
                status_code,
                message,
            },
        }
    }

    /// Map a transport-level failure onto the shared taxonomy
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Unknown(error.to_string())
        } else {
            Self::NetworkError(error.to_string())
        }
    }

    /// Critical errors abort a whole translation run
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::InvalidApiKey { .. } | Self::RateLimit | Self::NetworkError(_) | Self::InvalidRequest(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidApiKey { .. } => ErrorKind::InvalidApiKey,
            Self::RateLimit => ErrorKind::RateLimit,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::NetworkError(_) => ErrorKind::NetworkError,
            Self::ApiError { .. } => ErrorKind::ApiError,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }
}

/// Pull a human-readable message out of an API error body.
///
/// Both providers answer with `{"error": {"message": ...}}`; some gateways use a
/// top-level `message`. Anything else is returned verbatim.
fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "Unknown error".to_string();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|message| message.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| trimmed.to_string()),
        Err(_) => trimmed.to_string(),
    }
}

/// Errors that can occur while reading, rewriting or writing an EPUB archive
#[derive(Error, Debug)]
pub enum EpubError {
    /// The zip container itself is unreadable or could not be written
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// I/O failure while moving entry bytes
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An XML or XHTML entry could not be parsed or written
    #[error("Malformed markup in {path}: {message}")]
    Malformed {
        /// Archive path of the offending entry
        path: String,
        /// Parser message
        message: String,
    },

    /// An entry is not valid UTF-8
    #[error("Entry is not valid UTF-8: {0}")]
    InvalidEncoding(String),

    /// A referenced entry does not exist in the archive
    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    /// `META-INF/container.xml` does not point at a package document
    #[error("No package document declared in META-INF/container.xml")]
    MissingPackage,

    /// An entry that must be copied verbatim was about to be overwritten
    #[error("Entry {0} must be copied verbatim and cannot be overwritten")]
    ProtectedEntry(String),

    /// None of the path heuristics located the section in the archive
    #[error("Could not find path for section: {0}")]
    SectionNotFound(String),

    /// A text unit no longer addresses a text node of its document
    #[error("Text unit {0} does not address a text node")]
    StaleTextUnit(usize),

    /// Blocking archive work was aborted
    #[error("Background archive task failed: {0}")]
    Task(String),
}

/// Errors that can occur during an EPUB translation run
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("AI provider is not configured. Please select a provider.")]
    MissingProvider,

    #[error("API token is required for translation. Please configure it.")]
    MissingApiKey,

    #[error("Model is required for translation. Please select a model.")]
    MissingModel,

    #[error("Failed to decrypt API token. Please re-enter your API key.")]
    Decryption,

    #[error("Failed to load ePub file: {0}")]
    EpubLoad(String),

    #[error("No content found in ePub file. The file may be corrupted.")]
    EmptyEpub,

    /// Error from the provider API
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Error while processing a section document or the output archive
    #[error("Document error: {0}")]
    Document(#[from] EpubError),

    #[error("Translation failed for more than 50% of sections ({failed}/{total}). Aborting.")]
    TooManyFailures {
        /// Sections that failed so far
        failed: usize,
        /// Sections in the spine
        total: usize,
    },

    #[error("No sections were successfully translated. Please check your settings and try again.")]
    NoSectionsTranslated,

    #[error("Translation was cancelled.")]
    Cancelled,
}

impl TranslationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingProvider => ErrorKind::MissingProvider,
            Self::MissingApiKey => ErrorKind::MissingApiKey,
            Self::MissingModel => ErrorKind::MissingModel,
            Self::Decryption => ErrorKind::DecryptionError,
            Self::EpubLoad(_) => ErrorKind::EpubLoadError,
            Self::EmptyEpub => ErrorKind::EmptyEpub,
            Self::Provider(error) => error.kind(),
            Self::Document(_) => ErrorKind::Unknown,
            Self::TooManyFailures { .. } => ErrorKind::TooManyFailures,
            Self::NoSectionsTranslated => ErrorKind::NoSectionsTranslated,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether a section-level occurrence of this error must abort the run
    pub fn is_critical(&self) -> bool {
        match self {
            Self::Provider(error) => error.is_critical(),
            Self::Document(_) => false,
            _ => true,
        }
    }
}

/// Errors raised by the caller-side job slot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobSlotError {
    /// Another translation run already holds the slot
    #[error("A translation is already in progress for {holder}")]
    Busy {
        /// Key of the run currently holding the slot
        holder: String,
    },
}
