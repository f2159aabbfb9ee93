//! Type Conversions for ReadError

use super::types::ReadError;

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "port closed");
        let err: ReadError = io.into();
        assert!(matches!(err, ReadError::Io(msg) if msg.contains("port closed")));
    }

    #[test]
    fn test_io_timeout_maps_to_read_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "serial timeout");
        assert_eq!(ReadError::from(io), ReadError::Timeout);
    }
}
