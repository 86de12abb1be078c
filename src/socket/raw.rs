use tracing::trace;

use crate::addr::{Domain, Ipv4, SocketAddrV4, ToSockAddr};
use crate::error::{IoError, SocketError, errno};
use crate::transport::{RawHandle, RecvResult, Transport};
use super::{SockType, Stream, set_keepalive, set_tcp_nodelay};

/// Blocking IPv4/TCP transport on raw libc syscalls.
///
/// Stateless apart from the options applied to every socket it opens, so
/// one value can serve any number of clients.
///
/// # Example
/// ```ignore
/// use slotlane::LibcTransport;
///
/// let transport = LibcTransport::new().nodelay(true).keepalive(true);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcTransport {
	nodelay: bool,
	keepalive: bool,
}

impl LibcTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set TCP_NODELAY on opened sockets.
	pub fn nodelay(mut self, enable: bool) -> Self {
		self.nodelay = enable;
		self
	}

	/// Set SO_KEEPALIVE on opened sockets.
	pub fn keepalive(mut self, enable: bool) -> Self {
		self.keepalive = enable;
		self
	}

	fn apply_options(&self, handle: RawHandle) -> std::io::Result<()> {
		if self.nodelay {
			set_tcp_nodelay(handle, true)?;
		}
		if self.keepalive {
			set_keepalive(handle, true)?;
		}
		Ok(())
	}
}

impl Transport for LibcTransport {
	/// Creates the socket with `SOCK_CLOEXEC`, left in blocking mode.
	fn open(&self) -> std::io::Result<RawHandle> {
		let fd = unsafe {
			libc::socket(Ipv4::raw(), Stream::raw() | libc::SOCK_CLOEXEC, libc::IPPROTO_TCP)
		};
		if fd == -1 {
			return Err(SocketError::Create { errno: errno() }.into());
		}
		if let Err(err) = self.apply_options(fd) {
			unsafe { libc::close(fd) };
			return Err(err);
		}
		trace!(fd, "socket opened");
		Ok(fd)
	}

	fn connect(&self, handle: RawHandle, addr: SocketAddrV4) -> std::io::Result<()> {
		let result = addr.with_raw(|ptr, len| unsafe {
			libc::connect(handle, ptr, len)
		});

		match result {
			Some(-1) => Err(SocketError::Connect {
				errno: errno(),
				addr: addr.to_string(),
			}.into()),
			Some(_) => Ok(()),
			None => Err(SocketError::InvalidAddress {
				reason: "address not representable",
			}.into()),
		}
	}

	/// `MSG_NOSIGNAL` turns a dead peer into `EPIPE` instead of SIGPIPE.
	fn send(&self, handle: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
		let n = unsafe {
			libc::send(
				handle,
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				libc::MSG_NOSIGNAL,
			)
		};

		if n == -1 {
			Err(IoError::Write { errno: errno() }.into())
		} else {
			Ok(n as usize)
		}
	}

	/// Drains whatever is pending without waiting for more (`MSG_DONTWAIT`).
	///
	/// An orderly shutdown by the peer is reported as
	/// `IoError::ConnectionClosed`, never as `Received(0)`.
	fn recv(&self, handle: RawHandle, buf: &mut [u8]) -> std::io::Result<RecvResult> {
		if buf.is_empty() {
			return Ok(RecvResult::Received(0));
		}
		let n = unsafe {
			libc::recv(
				handle,
				buf.as_mut_ptr() as *mut libc::c_void,
				buf.len(),
				libc::MSG_DONTWAIT,
			)
		};

		match n {
			-1 => match errno() {
				libc::EAGAIN => Ok(RecvResult::WouldBlock),
				e => Err(IoError::Read { errno: e }.into()),
			},
			0 => Err(IoError::ConnectionClosed.into()),
			n => Ok(RecvResult::Received(n as usize)),
		}
	}

	fn close(&self, handle: RawHandle) -> std::io::Result<()> {
		let result = unsafe { libc::close(handle) };
		if result == -1 {
			return Err(SocketError::Close { errno: errno(), handle }.into());
		}
		trace!(fd = handle, "socket closed");
		Ok(())
	}
}
