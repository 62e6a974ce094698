//! Error types shared by every recopy layer.

/// Boxed error returned by user-supplied converters and value hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for recopy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while copying values between types.
///
/// All of them are surfaced immediately to the caller; nothing is retried.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The destination cannot be written (nil pointer, empty dynamic slot).
    #[error("copy destination must be non-nil and addressable")]
    InvalidCopyDestination,

    /// The source cannot be read (nil pointer, empty dynamic slot).
    #[error("copy from must be non-nil and addressable")]
    InvalidCopyFrom,

    /// Source map keys cannot be converted into destination map keys.
    #[error("map's key type doesn't match: {from} -> {to}")]
    MapKeyNotMatch { from: String, to: String },

    /// A shape was encountered that has no copy strategy.
    #[error("not supported: {message}")]
    NotSupported { message: String },

    /// A name override in a copy tag does not start with an upper-case letter.
    #[error("copier field name tag must be start upper case: {tag:?}")]
    FieldNameTagStartNotUpperCase { tag: String },

    /// A `must,nopanic` field was not copied.
    #[error("field {field} has must tag but was not copied")]
    MustNotCopied { field: String },

    /// A registered type converter failed.
    #[error("converter {from} -> {to} failed: {source}")]
    Converter {
        from: String,
        to: String,
        #[source]
        source: BoxError,
    },

    /// Decoding external data into a typed value failed.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Encoding a typed value into external data failed.
    #[error("encode error: {message}")]
    Encode { message: String },
}

impl Error {
    /// Create a not-supported error.
    pub fn not_supported(message: impl Into<String>) -> Self {
        Error::NotSupported {
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    /// Create an encode error.
    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn error_display() {
        let e = Error::MustNotCopied {
            field: "Email".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "field Email has must tag but was not copied"
        );

        let e = Error::MapKeyNotMatch {
            from: "string".to_string(),
            to: "int".to_string(),
        };
        assert!(e.to_string().contains("string -> int"));
    }

    #[test]
    fn tag_error_quotes_tag() {
        let e = Error::FieldNameTagStartNotUpperCase {
            tag: "name".to_string(),
        };
        assert!(e.to_string().contains("\"name\""));
    }

    #[test]
    fn converter_error_has_source() {
        let e = Error::Converter {
            from: "Time".to_string(),
            to: "Timestamp".to_string(),
            source: "out of range".into(),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("out of range"));
    }

    #[test]
    fn helpers_build_variants() {
        assert!(matches!(Error::not_supported("x"), Error::NotSupported { .. }));
        assert!(matches!(Error::decode("x"), Error::Decode { .. }));
        assert!(matches!(Error::encode("x"), Error::Encode { .. }));
    }
}
