//! Error types for card rendering.

/// Result type alias for rendering.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Result type alias for print surface operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceFault>;

/// A failure reported by a print backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} failed: {message}")]
pub struct DeviceFault {
    /// Backend operation that failed (e.g. "start document").
    pub operation: &'static str,

    /// Backend-specific description.
    pub message: String,
}

impl DeviceFault {
    /// Create a new device fault.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    /// Create a device fault from an I/O error.
    pub fn io(operation: &'static str, error: &std::io::Error) -> Self {
        Self::new(operation, error.to_string())
    }
}

/// Errors that abort rendering one card.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The print device could not be opened.
    #[error("Failed to open print device {device}: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: DeviceFault,
    },

    /// The device refused to start a document.
    #[error("Failed to start print document: {source}")]
    DocumentStart {
        #[source]
        source: DeviceFault,
    },

    /// The device refused to start a page.
    #[error("Failed to start print page: {source}")]
    PageStart {
        #[source]
        source: DeviceFault,
    },

    /// The finished document could not be handed to the spooler.
    #[error("Failed to submit print job: {source}")]
    Submit {
        #[source]
        source: DeviceFault,
    },
}

impl RenderError {
    /// Create a new device open error. `None` names the system default.
    pub fn device_open(device: Option<&str>, source: DeviceFault) -> Self {
        Self::DeviceOpen {
            device: device.unwrap_or("(system default)").to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_open_names_default() {
        let error = RenderError::device_open(None, DeviceFault::new("open", "no printers"));
        assert_eq!(
            error.to_string(),
            "Failed to open print device (system default): open failed: no printers"
        );
    }

    #[test]
    fn test_submit_error_display() {
        let error = RenderError::Submit {
            source: DeviceFault::new("submit job", "lp exited with status 1"),
        };
        assert_eq!(
            error.to_string(),
            "Failed to submit print job: submit job failed: lp exited with status 1"
        );
    }
}
