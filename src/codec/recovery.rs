//! Recovery policies for codec errors.

/// How the read loop responds to a codec error.
///
/// [`CodecError::default_recovery_policy`](crate::codec::CodecError::default_recovery_policy)
/// returns the policy for each error type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Discard the offending message and continue reading.
    ///
    /// Used for malformed envelopes and oversized messages. The connection
    /// stays open and a protocol-error event is emitted.
    #[default]
    Drop,

    /// Terminate the connection.
    ///
    /// Used for transport failures and end-of-stream.
    Disconnect,
}

impl RecoveryPolicy {
    /// Returns the policy name as a static string for metrics and logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use hubwire::codec::RecoveryPolicy;
    ///
    /// assert_eq!(RecoveryPolicy::Drop.as_str(), "drop");
    /// assert_eq!(RecoveryPolicy::Disconnect.as_str(), "disconnect");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Disconnect => "disconnect",
        }
    }
}
