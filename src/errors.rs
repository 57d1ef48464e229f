//! Crate-specific error and result types, plus common conversions.

use ::std::fmt::{self, Display};

/// Result type returned by fallible device, configuration and backend
/// operations.
pub type Result<T> = ::std::result::Result<T, Error>;

/// The category of failure which occurred.
#[derive(Debug, ::thiserror::Error)]
pub enum ErrorKind {
    /// A device could not acquire its platform resources or populate its
    /// symbol table. The device is destroyed and excluded from the manager.
    #[error("device initialization failed: {0}")]
    DeviceInit(String),

    /// A configuration value was outside of its permitted range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The OS refused to spawn a background worker thread.
    #[error("failed to spawn background thread")]
    ThreadSpawn(#[source] ::std::io::Error),

    /// A platform backend (gamepad, motion sensor) reported a failure.
    #[error("platform backend failure: {0}")]
    Backend(String),
}

/// Error type for fallible operations. The error attempts to pro-actively
/// capture as much context as possible about what was happening at the time
/// of failure.
#[derive(Debug)]
pub struct Error {
    /// The underlying failure.
    kind: ErrorKind,

    /// An optional context information which describes what was happening
    /// at the time error.
    context: Option<String>,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { kind, context } = &self;

        if let Some(context) = context {
            write!(f, "{context}\nCaused by:\n    {kind}")
        } else {
            write!(f, "{kind}")
        }
    }
}

impl ::std::error::Error for Error {
    fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }
}

impl Error {
    /// Returns the category of failure.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context message attached to the error, if any.
    pub fn context_message(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Shorthand for a [`ErrorKind::DeviceInit`] error.
    pub fn device_init(reason: impl Into<String>) -> Self {
        ErrorKind::DeviceInit(reason.into()).into()
    }

    /// Shorthand for a [`ErrorKind::InvalidConfig`] error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        ErrorKind::InvalidConfig(reason.into()).into()
    }

    /// Shorthand for a [`ErrorKind::Backend`] error.
    pub fn backend(reason: impl Into<String>) -> Self {
        ErrorKind::Backend(reason.into()).into()
    }
}

/// A crate-private trait which allows context information to be attached to
/// fallible types.
pub(crate) trait Context<T> {
    /// Attach a context message to a fallible type and return crate error.
    fn context(self, ctx: impl AsRef<str>) -> Result<T>
    where
        Self: Sized;
}

impl<T> Context<T> for Result<T> {
    fn context(mut self, ctx: impl AsRef<str>) -> Result<T>
    where
        Self: Sized,
    {
        if let Err(err) = &mut self {
            err.context = Some(ctx.as_ref().to_owned());
        }
        self
    }
}

impl<T> Context<T> for ::std::result::Result<T, ::std::io::Error> {
    fn context(self, ctx: impl AsRef<str>) -> Result<T> {
        self.map_err(|source| Error {
            kind: ErrorKind::ThreadSpawn(source),
            context: Some(ctx.as_ref().to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    #[test]
    fn test_display_without_context() {
        let err = Error::device_init("no keyboard attached");
        assert_eq!(
            err.to_string(),
            "device initialization failed: no keyboard attached"
        );
    }

    #[test]
    fn test_display_with_context() {
        let err = Err::<(), _>(Error::invalid_config("dead zone 1.5"))
            .context("Failed to build input configuration")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to build input configuration\nCaused by:\n    invalid configuration: dead zone 1.5"
        );
        assert_eq!(
            err.context_message(),
            Some("Failed to build input configuration")
        );
    }

    #[test]
    fn test_io_error_maps_to_thread_spawn() {
        let io = ::std::io::Error::new(::std::io::ErrorKind::Other, "out of threads");
        let err = Err::<(), _>(io).context("spawn poller").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ThreadSpawn(_)));
        assert!(::std::error::Error::source(&err).is_some());
    }
}
