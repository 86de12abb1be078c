//! The blocking socket primitives the client is written against.

use crate::addr::SocketAddrV4;

/// Native socket handle as stored in the registry.
pub type RawHandle = libc::c_int;

/// Outcome of a receive that did not fail.
///
/// `WouldBlock` is a probe result, not an error: nothing was pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvResult {
	/// `n` bytes were written into the front of the buffer.
	Received(usize),
	/// No data was available right now.
	WouldBlock,
}

/// Blocking stream-socket primitives.
///
/// Every call runs to completion on the caller's thread. There is no
/// timeout and no cancellation; a call that hangs hangs the caller.
pub trait Transport {
	/// Creates an IPv4 TCP socket.
	fn open(&self) -> std::io::Result<RawHandle>;

	/// Connects `handle` to `addr`, blocking until established or refused.
	fn connect(&self, handle: RawHandle, addr: SocketAddrV4) -> std::io::Result<()>;

	/// Sends `buf`, returning how many bytes the stack accepted.
	fn send(&self, handle: RawHandle, buf: &[u8]) -> std::io::Result<usize>;

	/// Receives up to `buf.len()` bytes.
	fn recv(&self, handle: RawHandle, buf: &mut [u8]) -> std::io::Result<RecvResult>;

	/// Closes `handle`.
	fn close(&self, handle: RawHandle) -> std::io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
	fn open(&self) -> std::io::Result<RawHandle> {
		(**self).open()
	}

	fn connect(&self, handle: RawHandle, addr: SocketAddrV4) -> std::io::Result<()> {
		(**self).connect(handle, addr)
	}

	fn send(&self, handle: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
		(**self).send(handle, buf)
	}

	fn recv(&self, handle: RawHandle, buf: &mut [u8]) -> std::io::Result<RecvResult> {
		(**self).recv(handle, buf)
	}

	fn close(&self, handle: RawHandle) -> std::io::Result<()> {
		(**self).close(handle)
	}
}
