//! Error types for the exec monitor
//!
//! Startup failures are split by the stage that produced them so the
//! operator can tell a verifier rejection from a missing privilege.

use std::fmt;
use std::io;

/// Errors raised by the exec monitor library
#[derive(Debug)]
pub enum MonitorError {
    /// The eBPF object could not be read, parsed or passed through the verifier
    Compile(String),
    /// The requested syscall does not exist on this kernel
    Resolution(String),
    /// The program could not be attached (privilege, resources)
    Attachment(String),
    /// A kernel map could not be opened or read
    Map(String),
    /// Writing a report failed
    Output(io::Error),
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Compile(e) => write!(f, "Compile error: {}", e),
            MonitorError::Resolution(e) => write!(f, "Resolution error: {}", e),
            MonitorError::Attachment(e) => write!(f, "Attachment error: {}", e),
            MonitorError::Map(e) => write!(f, "Map error: {}", e),
            MonitorError::Output(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MonitorError {
    fn from(error: io::Error) -> Self {
        MonitorError::Output(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display() {
        let err = MonitorError::Resolution("no kernel symbol for syscall 'nope'".to_string());
        assert_eq!(
            err.to_string(),
            "Resolution error: no kernel symbol for syscall 'nope'"
        );
    }

    #[test]
    fn test_output_source() {
        let err = MonitorError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert!(matches!(err, MonitorError::Output(_)));
        assert!(err.source().is_some());
        assert!(MonitorError::Compile("verifier".into()).source().is_none());
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = MonitorError::Compile("bad object".into()).into();
        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::Compile(_))
        ));
    }
}
