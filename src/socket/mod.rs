//! Linux socket plumbing: the libc transport and the accepting listener.

mod listener;
mod options;
mod raw;

pub use self::listener::SlotListener;
pub use self::options::{set_keepalive, set_reuse_addr, set_tcp_nodelay};
pub use self::raw::LibcTransport;

/// Trait for socket type markers.
///
/// Each type implementing this trait represents a socket type
/// that can be passed to the `socket()` syscall.
pub trait SockType {
	/// Returns the libc constant for this socket type.
	fn raw() -> libc::c_int;
}

/// Stream socket marker.
///
/// Reliable, ordered, two-way byte stream. With `Ipv4` this is TCP.
pub struct Stream;

impl SockType for Stream {
	#[inline]
	fn raw() -> libc::c_int {
		libc::SOCK_STREAM
	}
}
