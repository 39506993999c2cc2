//! Error types for the telemetry bridge.
//!
//! Errors fall into two families with very different consequences:
//!
//! - **Setup errors** ([`BridgeError`]): socket, shared memory, output registration or
//!   configuration failures. These abort startup and the process exits non-zero.
//! - **Per-datagram errors** ([`DecodeError`], [`ChannelFull`]): malformed input or a
//!   full channel. These are recoverable; the frame is flagged or dropped and the
//!   bridge keeps running.
//!
//! ## Recovery
//!
//! ```rust
//! use fgfdm::BridgeError;
//!
//! let error = BridgeError::socket("bind 0.0.0.0:5500", std::io::Error::other("in use"));
//! if !error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type alias for bridge operations.
pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

/// Repeated group of the wire frame, used for overflow diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameGroup {
    Engines,
    Tanks,
    Wheels,
}

impl std::fmt::Display for FrameGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FrameGroup::Engines => "engines",
            FrameGroup::Tanks => "tanks",
            FrameGroup::Wheels => "wheels",
        })
    }
}

/// Why a datagram could not be turned into a valid telemetry frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid data length (is: {actual} should be: {expected})")]
    LengthMismatch { actual: usize, expected: usize },

    #[error("invalid data version (is: {found} should be: {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("{group} count {count} exceeds maximum of {max}")]
    GroupOverflow { group: FrameGroup, count: u32, max: usize },
}

/// The ring channel had no free slot; the frame was dropped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("fifo overflow")]
pub struct ChannelFull;

/// Main error type for bridge setup and fatal runtime failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Socket error during {operation}")]
    Socket {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket receive failed")]
    SocketFatal {
        #[source]
        source: std::io::Error,
    },

    #[error("Shared memory error in {operation} for `{name}`")]
    SharedMemory {
        operation: String,
        name: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Shared memory `{name}` size mismatch: expected {expected} bytes, found {actual}")]
    RegionSize { name: String, expected: usize, actual: u64 },

    #[error("Unable to register output `{name}`: {reason}")]
    OutputRegistration { name: String, reason: String },

    #[error("Unable to install {signal} handler")]
    Signal {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {details}")]
    Config {
        details: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BridgeError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// A port still held by a previous listener and a receive failure on a socket
    /// that has since recovered are worth a restart; everything else needs fixing
    /// first.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Socket { source, .. } => source.kind() == std::io::ErrorKind::AddrInUse,
            BridgeError::SocketFatal { .. } => true,
            BridgeError::SharedMemory { .. } => false,
            BridgeError::RegionSize { .. } => false,
            BridgeError::OutputRegistration { .. } => false,
            BridgeError::Signal { .. } => false,
            BridgeError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            BridgeError::Socket { .. } => vec![
                "Check that the UDP port is not already bound",
                "Verify the bind address exists on this host",
                "Ports below 1024 need elevated privileges",
            ],
            BridgeError::SocketFatal { .. } => vec![
                "Check network interface state",
                "Restart the listener process",
            ],
            BridgeError::SharedMemory { .. } => vec![
                "Check permissions on /dev/shm",
                "Remove a stale region left by a crashed process",
                "Verify both sides use the same region name",
            ],
            BridgeError::RegionSize { .. } => vec![
                "Rebuild both sides from the same version",
                "Remove the stale region and restart both sides",
            ],
            BridgeError::OutputRegistration { .. } => vec![
                "Use a unique output prefix per bridge instance",
                "Check the prefix for empty segments",
            ],
            BridgeError::Signal { .. } => vec![
                "Check that the process is not running with signals blocked",
                "Run the bridge under a supervisor that forwards SIGTERM",
            ],
            BridgeError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Remove unknown keys from the configuration",
                "Use positive values for timeout and period",
            ],
        }
    }

    /// Helper constructor for socket setup errors.
    pub fn socket(operation: impl Into<String>, source: std::io::Error) -> Self {
        BridgeError::Socket { operation: operation.into(), source }
    }

    /// Helper constructor for shared memory errors with an OS source.
    pub fn shared_memory(
        operation: impl Into<String>,
        name: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BridgeError::SharedMemory {
            operation: operation.into(),
            name: name.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper constructor for invalid shared memory names.
    pub fn invalid_region_name(name: impl Into<String>, reason: &str) -> Self {
        BridgeError::SharedMemory {
            operation: format!("name validation ({})", reason),
            name: name.into(),
            source: None,
        }
    }

    /// Helper constructor for output registration errors.
    pub fn output_registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::OutputRegistration { name: name.into(), reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        BridgeError::Config { details: details.into(), source: None }
    }

    /// Helper constructor for configuration errors with source.
    pub fn config_with_source(
        details: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BridgeError::Config { details: details.into(), source: Some(source) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_errors_mention_both_values(
                actual in 0usize..100_000usize,
                expected in 0usize..100_000usize,
                found in any::<u32>(),
                wanted in any::<u32>(),
            ) {
                let length = DecodeError::LengthMismatch { actual, expected }.to_string();
                prop_assert!(length.contains(&actual.to_string()));
                prop_assert!(length.contains(&expected.to_string()));

                let version = DecodeError::VersionMismatch { found, expected: wanted }.to_string();
                prop_assert!(version.contains(&found.to_string()));
                prop_assert!(version.contains(&wanted.to_string()));
            }

            #[test]
            fn setup_errors_keep_their_context(
                operation in "\\w+",
                name in "/[a-z]{1,16}",
                details in ".*",
            ) {
                let shm = BridgeError::shared_memory(
                    operation.clone(),
                    name.clone(),
                    std::io::Error::other("denied"),
                );
                let msg = shm.to_string();
                prop_assert!(msg.contains(&operation));
                prop_assert!(msg.contains(&name));

                let config = BridgeError::config(details.clone());
                prop_assert!(config.to_string().contains(&details));
                prop_assert!(!config.is_retryable());
            }
        }
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = BridgeError::socket("bind", io);
        let source = std::error::Error::source(&err).expect("socket errors carry a source");
        assert_eq!(source.to_string(), "address in use");
        assert!(err.is_retryable());
        assert!(!BridgeError::socket("bind", std::io::Error::other("no such address")).is_retryable());
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BridgeError>();
        assert_send_sync_static::<DecodeError>();

        let error = BridgeError::config("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn every_error_has_suggestions() {
        let errors = [
            BridgeError::socket("bind", std::io::Error::other("x")),
            BridgeError::SocketFatal { source: std::io::Error::other("x") },
            BridgeError::invalid_region_name("bad", "missing leading '/'"),
            BridgeError::RegionSize { name: "/x".into(), expected: 8, actual: 4 },
            BridgeError::output_registration("fgfdm.pos.agl", "duplicate name"),
            BridgeError::Signal { signal: "SIGTERM", source: std::io::Error::other("x") },
            BridgeError::config("bad"),
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error}");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn group_names_are_lowercase() {
        assert_eq!(FrameGroup::Engines.to_string(), "engines");
        let err = DecodeError::GroupOverflow { group: FrameGroup::Wheels, count: 9, max: 3 };
        assert_eq!(err.to_string(), "wheels count 9 exceeds maximum of 3");
    }
}
