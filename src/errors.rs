/*!
 * Error types for the lookerip application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * The conversion pipeline distinguishes a soft failure (`SubtitleError::UnrecognizedFormat`,
 * reported and turned into a `false` result by the converter) from hard failures
 * (`DecodeError`, `EncodingError`) that are propagated to the caller.
 */

use thiserror::Error;

use crate::subtitle::sniffer::SubtitleFormat;

/// Errors raised by a format decoder when the payload violates its grammar
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The mandatory file signature is missing
    #[error("Missing file header: {0}")]
    MissingHeader(&'static str),

    /// A timestamp could not be parsed
    #[error("Invalid timestamp: '{value}'")]
    InvalidTimestamp {
        /// Raw timestamp text
        value: String,
    },

    /// A tag was opened but never closed
    #[error("Unterminated tag: <{tag}>")]
    UnterminatedTag {
        /// Tag name (or the markup construct) left open
        tag: String,
    },

    /// A closing tag did not match the innermost open element
    #[error("Mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        /// Name of the element that was open
        expected: String,
        /// Name of the closing tag that was found
        found: String,
    },

    /// The document root element is missing
    #[error("Missing root element <{0}>")]
    MissingRoot(&'static str),

    /// An MP4 box is truncated or has an impossible size
    #[error("Malformed '{box_type}' box: {reason}")]
    MalformedBox {
        /// Four character box type
        box_type: String,
        /// What was wrong with it
        reason: String,
    },

    /// A required payload element is absent
    #[error("Missing payload: {0}")]
    MissingPayload(&'static str),

    /// The JSON document could not be parsed
    #[error("Invalid JSON document: {0}")]
    InvalidJson(String),

    /// The bytes could not be decoded as text
    #[error("Invalid text encoding: {0}")]
    InvalidText(String),

    /// An attribute value is not usable
    #[error("Invalid value '{value}' for attribute '{name}'")]
    InvalidAttribute {
        /// Attribute name
        name: String,
        /// Offending value
        value: String,
    },
}

impl DecodeError {
    /// Shorthand for a malformed box error
    pub fn malformed_box(box_type: &[u8; 4], reason: impl Into<String>) -> Self {
        Self::MalformedBox {
            box_type: String::from_utf8_lossy(box_type).into_owned(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>) -> Self {
        Self::InvalidTimestamp { value: value.into() }
    }
}

/// Errors raised while encoding the serialized output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// The encoding label is not known
    #[error("Unknown character encoding: {0}")]
    UnknownEncoding(String),

    /// A character of a cue cannot be represented in the target encoding
    #[error("Character {character:?} in cue {cue_index} cannot be represented in {encoding}")]
    Unrepresentable {
        /// The offending character
        character: char,
        /// 1-based index of the cue containing it
        cue_index: usize,
        /// Name of the target encoding
        encoding: String,
    },
}

/// Errors that can occur during subtitle conversion
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// Sniffing found no known signature
    #[error("Subtitle format was unrecognized")]
    UnrecognizedFormat,

    /// The sniffed format's decoder rejected the payload
    #[error("Failed to decode {format} subtitle: {source}")]
    Decode {
        /// Format the payload was sniffed as
        format: SubtitleFormat,
        /// Underlying decoder error
        #[source]
        source: DecodeError,
    },

    /// The output could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// Reading the input or writing the destination failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SubtitleError {
    /// Whether this error is the soft "unrecognized format" condition
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::UnrecognizedFormat)
    }
}

/// Errors that can occur when talking to the media service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// The catalogue has no media with this id
    #[error("Media {media_id} not found: {response}")]
    MediaNotFound {
        /// Requested media id
        media_id: u64,
        /// Raw service response
        response: String,
    },
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the media service
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Error from subtitle conversion
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
