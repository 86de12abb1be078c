/// Socket setup, connect and teardown errors.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("socket() failed: {}", errno_to_str(*.errno))]
    Create { errno: i32 },

    #[error("connect({addr}) failed: {}", errno_to_str(*.errno))]
    Connect { errno: i32, addr: String },

    #[error("close(fd={handle}) failed: {}", errno_to_str(*.errno))]
    Close { errno: i32, handle: i32 },

    #[error("bind({addr}) failed: {}", errno_to_str(*.errno))]
    Bind { errno: i32, addr: String },

    #[error("listen(backlog={backlog}) failed: {}", errno_to_str(*.errno))]
    Listen { errno: i32, backlog: i32 },

    #[error("accept() failed: {}", errno_to_str(*.errno))]
    Accept { errno: i32 },

    #[error("setsockopt({option}) failed: {}", errno_to_str(*.errno))]
    SetOption { errno: i32, option: &'static str },

    #[error("getsockopt({option}) failed: {}", errno_to_str(*.errno))]
    GetOption { errno: i32, option: &'static str },

    #[error("could not resolve {host:?}: {reason}")]
    Resolve { host: String, reason: String },

    #[error("no free socket slot")]
    NoSlotAvailable,

    #[error("client already holds slot {slot}")]
    AlreadyConnected { slot: u8 },

    #[error("client was stopped and cannot reconnect")]
    Stopped,

    #[error("placeholder client cannot connect")]
    InvalidClient,

    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },
}

/// I/O operation errors.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("recv() failed: {}", errno_to_str(*.errno))]
    Read { errno: i32 },

    #[error("send() failed: {}", errno_to_str(*.errno))]
    Write { errno: i32 },

    #[error("short write: {written} of {requested} bytes accepted")]
    ShortWrite { written: usize, requested: usize },

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("client is not connected")]
    NotConnected,

    #[error("operation would block")]
    WouldBlock,
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
    unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
fn errno_to_str(errno: i32) -> String {
    match errno {
        libc::EACCES => "permission denied".into(),
        libc::EADDRINUSE => "address already in use".into(),
        libc::EADDRNOTAVAIL => "address not available".into(),
        libc::EAFNOSUPPORT => "address family not supported".into(),
        libc::EAGAIN => "resource temporarily unavailable".into(),
        libc::EBADF => "bad file descriptor".into(),
        libc::ECONNREFUSED => "connection refused".into(),
        libc::ECONNRESET => "connection reset by peer".into(),
        libc::EHOSTUNREACH => "host unreachable".into(),
        libc::EINTR => "interrupted by signal".into(),
        libc::EINVAL => "invalid argument".into(),
        libc::EISCONN => "already connected".into(),
        libc::EMFILE => "too many open files".into(),
        libc::ENETUNREACH => "network unreachable".into(),
        libc::ENOBUFS => "no buffer space available".into(),
        libc::ENOTCONN => "not connected".into(),
        libc::EPIPE => "broken pipe".into(),
        libc::ETIMEDOUT => "connection timed out".into(),
        _ => format!("errno {}", errno),
    }
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
    match errno {
        libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
        libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
        libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
        libc::EAGAIN => std::io::ErrorKind::WouldBlock,
        libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
        libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
        libc::EHOSTUNREACH => std::io::ErrorKind::HostUnreachable,
        libc::ENETUNREACH => std::io::ErrorKind::NetworkUnreachable,
        libc::EINTR => std::io::ErrorKind::Interrupted,
        libc::EINVAL => std::io::ErrorKind::InvalidInput,
        libc::ENOTCONN => std::io::ErrorKind::NotConnected,
        libc::EPIPE => std::io::ErrorKind::BrokenPipe,
        libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
        _ => std::io::ErrorKind::Other,
    }
}

impl SocketError {
    /// The `std::io::ErrorKind` this error surfaces as.
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            SocketError::Create { errno }
            | SocketError::Connect { errno, .. }
            | SocketError::Close { errno, .. }
            | SocketError::Bind { errno, .. }
            | SocketError::Listen { errno, .. }
            | SocketError::Accept { errno }
            | SocketError::SetOption { errno, .. }
            | SocketError::GetOption { errno, .. } => errno_to_kind(*errno),
            SocketError::Resolve { .. } => std::io::ErrorKind::NotFound,
            SocketError::NoSlotAvailable => std::io::ErrorKind::OutOfMemory,
            SocketError::AlreadyConnected { .. } => std::io::ErrorKind::AlreadyExists,
            SocketError::Stopped | SocketError::InvalidClient => std::io::ErrorKind::InvalidInput,
            SocketError::InvalidAddress { .. } => std::io::ErrorKind::InvalidInput,
        }
    }
}

impl IoError {
    /// The `std::io::ErrorKind` this error surfaces as.
    pub fn kind(&self) -> std::io::ErrorKind {
        match self {
            IoError::Read { errno } | IoError::Write { errno } => errno_to_kind(*errno),
            IoError::ShortWrite { .. } => std::io::ErrorKind::WriteZero,
            IoError::ConnectionClosed => std::io::ErrorKind::ConnectionReset,
            IoError::NotConnected => std::io::ErrorKind::NotConnected,
            IoError::WouldBlock => std::io::ErrorKind::WouldBlock,
        }
    }
}

impl From<SocketError> for std::io::Error {
    fn from(err: SocketError) -> Self {
        std::io::Error::new(err.kind(), err)
    }
}

impl From<IoError> for std::io::Error {
    fn from(err: IoError) -> Self {
        std::io::Error::new(err.kind(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_refused_keeps_errno_kind() {
        let err: std::io::Error = SocketError::Connect {
            errno: libc::ECONNREFUSED,
            addr: "192.0.2.1:7000".into(),
        }
        .into();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn unknown_errno_is_formatted_numerically() {
        assert_eq!(errno_to_str(9999), "errno 9999");
        assert_eq!(errno_to_kind(9999), std::io::ErrorKind::Other);
    }

    #[test]
    fn slot_exhaustion_and_short_write_have_distinct_kinds() {
        let slots: std::io::Error = SocketError::NoSlotAvailable.into();
        let short: std::io::Error = IoError::ShortWrite { written: 6, requested: 10 }.into();
        assert_ne!(slots.kind(), short.kind());
        assert_eq!(short.to_string(), "short write: 6 of 10 bytes accepted");
    }
}
