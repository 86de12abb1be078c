//! The buffered, slot-registered TCP client.
//!
//! One type serves both ends of a connection. User code builds an unbound
//! client and calls [`connect`](BufferedSocketClient::connect); a listener
//! builds one around a slot it already populated with
//! [`accepted`](BufferedSocketClient::accepted). After that both behave
//! the same: writes go straight to the transport, reads are served from a
//! single receive buffer that [`available`](BufferedSocketClient::available)
//! refills once it has been drained.

mod config;

pub use self::config::{ClientConfig, DEFAULT_RX_CAPACITY, WritePolicy};

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::addr::SocketAddrV4;
use crate::error::{IoError, SocketError};
use crate::registry::{Slot, SlotRole, SlotTable, SocketRegistry};
use crate::resolve::Resolver;
use crate::socket::LibcTransport;
use crate::transport::{RawHandle, RecvResult, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
	/// Fresh client, never connected. `connect` is allowed.
	Unbound,
	Bound(Slot),
	/// Torn down. Terminal.
	Closed,
	/// Placeholder carrying `Slot::INVALID`. Terminal and inert.
	Invalid,
}

/// Buffered TCP stream client bound to a registry slot.
///
/// Byte-stream operations never fail loudly: they return `0`/`false` when
/// the client is not bound, and a transport failure during `write` or
/// `available` closes the connection before returning `0`. Bytes already
/// in the receive buffer survive that teardown and can still be read.
pub struct BufferedSocketClient<T: Transport = LibcTransport, R: SocketRegistry = Arc<SlotTable>> {
	transport: T,
	registry: R,
	binding: Binding,
	rx: Box<[u8]>,
	cursor: usize,
	fill: usize,
	write_policy: WritePolicy,
}

impl<T: Transport, R: SocketRegistry> BufferedSocketClient<T, R> {
	/// Creates an unbound client-role instance.
	pub fn new(transport: T, registry: R) -> Self {
		Self::with_binding(transport, registry, Binding::Unbound)
	}

	/// Wraps a slot that the accepting side has already published in
	/// `registry`. The client starts out bound.
	///
	/// Passing [`Slot::INVALID`] yields the same value as
	/// [`placeholder`](Self::placeholder).
	pub fn accepted(transport: T, registry: R, slot: Slot) -> Self {
		let binding = if slot == Slot::INVALID {
			Binding::Invalid
		} else {
			Binding::Bound(slot)
		};
		Self::with_binding(transport, registry, binding)
	}

	/// A deliberately invalid client, e.g. "nobody is waiting to be
	/// accepted". [`is_valid`](Self::is_valid) is false for it and for
	/// nothing else.
	pub fn placeholder(transport: T, registry: R) -> Self {
		Self::with_binding(transport, registry, Binding::Invalid)
	}

	fn with_binding(transport: T, registry: R, binding: Binding) -> Self {
		let config = ClientConfig::default();
		Self {
			transport,
			registry,
			binding,
			rx: vec![0; config.rx_capacity].into_boxed_slice(),
			cursor: 0,
			fill: 0,
			write_policy: config.write_policy,
		}
	}

	/// Applies `config`. Resizing the receive buffer discards its contents.
	pub fn with_config(mut self, config: ClientConfig) -> Self {
		let capacity = config.rx_capacity.max(1);
		if capacity != self.rx.len() {
			self.rx = vec![0; capacity].into_boxed_slice();
			self.cursor = 0;
			self.fill = 0;
		}
		self.write_policy = config.write_policy;
		self
	}

	/// Opens a TCP connection to `addr`, blocking until it is established.
	///
	/// Fails without side effects when the client is already bound, was
	/// stopped, or is a placeholder. On any later failure the opened handle
	/// is closed and the claimed slot goes back to the registry.
	pub fn connect(&mut self, addr: SocketAddrV4) -> std::io::Result<()> {
		self.ensure_connectable()?;

		let Some(slot) = self.registry.acquire_free_slot() else {
			warn!(%addr, "connect: no free slot");
			return Err(SocketError::NoSlotAvailable.into());
		};

		let handle = match self.transport.open() {
			Ok(handle) => handle,
			Err(err) => {
				self.registry.release_slot(slot);
				warn!(%addr, error = %err, "connect: socket open failed");
				return Err(err);
			}
		};

		if let Err(err) = self.transport.connect(handle, addr) {
			if let Err(close_err) = self.transport.close(handle) {
				warn!(handle, error = %close_err, "connect: close after failed connect failed");
			}
			self.registry.release_slot(slot);
			warn!(%addr, error = %err, "connect failed");
			return Err(err);
		}

		self.registry.set_entry(slot, handle, addr.port(), SlotRole::TcpClient);
		self.binding = Binding::Bound(slot);
		debug!(%slot, handle, %addr, "connected");
		Ok(())
	}

	/// Resolves `host` through `resolver`, then [`connect`](Self::connect)s.
	///
	/// A resolution failure claims nothing.
	pub fn connect_host<N: Resolver>(&mut self, resolver: &N, host: &str, port: u16) -> std::io::Result<()> {
		self.ensure_connectable()?;
		let ip = resolver.resolve(host)?;
		self.connect(SocketAddrV4::new(ip, port))
	}

	fn ensure_connectable(&self) -> std::io::Result<()> {
		match self.binding {
			Binding::Unbound => Ok(()),
			Binding::Bound(slot) => Err(SocketError::AlreadyConnected { slot: slot.index() }.into()),
			Binding::Closed => Err(SocketError::Stopped.into()),
			Binding::Invalid => Err(SocketError::InvalidClient.into()),
		}
	}

	/// Writes one byte. Returns 1 on success, 0 otherwise.
	pub fn write_byte(&mut self, byte: u8) -> usize {
		self.write(&[byte])
	}

	/// Writes `buf`, returning `buf.len()` on success and 0 on failure.
	///
	/// There is no partial success: under [`WritePolicy::Exact`] a short
	/// send counts as a dead connection, and any failure tears the client
	/// down.
	pub fn write(&mut self, buf: &[u8]) -> usize {
		let Some((slot, handle)) = self.live_handle() else {
			return 0;
		};

		let result = match self.write_policy {
			WritePolicy::Exact => self.send_exact(handle, buf),
			WritePolicy::Complete => self.send_all(handle, buf),
		};

		match result {
			Ok(n) => n,
			Err(err) => {
				warn!(%slot, len = buf.len(), error = %err, "write failed, closing connection");
				self.teardown();
				0
			}
		}
	}

	fn send_exact(&self, handle: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
		let written = self.transport.send(handle, buf)?;
		if written != buf.len() {
			return Err(IoError::ShortWrite { written, requested: buf.len() }.into());
		}
		Ok(written)
	}

	fn send_all(&self, handle: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
		let mut written = 0;
		while written < buf.len() {
			match self.transport.send(handle, &buf[written..])? {
				0 => return Err(IoError::ShortWrite { written, requested: buf.len() }.into()),
				n => written += n,
			}
		}
		Ok(written)
	}

	/// Number of bytes ready to read.
	///
	/// Unread buffered bytes are reported without touching the transport.
	/// Once the buffer is drained, one receive refills it: "would block"
	/// leaves it empty and returns 0, a receive error tears the client down
	/// and returns 0.
	pub fn available(&mut self) -> usize {
		let Some((slot, handle)) = self.live_handle() else {
			return 0;
		};

		if self.cursor < self.fill {
			return self.fill - self.cursor;
		}

		match self.transport.recv(handle, &mut self.rx) {
			Ok(RecvResult::Received(n)) => {
				let n = n.min(self.rx.len());
				self.cursor = 0;
				self.fill = n;
				trace!(%slot, n, "receive buffer refilled");
				n
			}
			Ok(RecvResult::WouldBlock) => {
				self.cursor = 0;
				self.fill = 0;
				0
			}
			Err(err) => {
				warn!(%slot, error = %err, "receive failed, closing connection");
				self.teardown();
				self.flush();
				0
			}
		}
	}

	/// Next buffered byte, or 0 when nothing is buffered. Never refills.
	pub fn read_byte(&mut self) -> u8 {
		if self.cursor < self.fill {
			let byte = self.rx[self.cursor];
			self.cursor += 1;
			byte
		} else {
			0
		}
	}

	/// Fills every position of `dst` with [`read_byte`](Self::read_byte).
	///
	/// Positions past the buffered data get 0, so the return value is always
	/// `dst.len()`. Ask [`available`](Self::available) first to learn how
	/// many of them are real.
	pub fn read(&mut self, dst: &mut [u8]) -> usize {
		for byte in dst.iter_mut() {
			*byte = self.read_byte();
		}
		dst.len()
	}

	/// Next unread byte without consuming it, or 0 when nothing is buffered.
	pub fn peek(&self) -> u8 {
		if self.cursor < self.fill {
			self.rx[self.cursor]
		} else {
			0
		}
	}

	/// Discards the receive buffer. Does not touch the connection.
	pub fn flush(&mut self) {
		self.rx.fill(0);
		self.cursor = 0;
		self.fill = 0;
	}

	/// Closes the connection and releases its slot.
	///
	/// Does nothing unless bound. If the transport refuses to close the
	/// handle the client stays bound, so [`status`](Self::status) keeps
	/// reporting true. Buffered bytes are kept.
	pub fn stop(&mut self) {
		self.teardown();
	}

	/// The one path that closes a handle and releases a slot.
	fn teardown(&mut self) {
		let Binding::Bound(slot) = self.binding else {
			return;
		};

		match self.registry.handle(slot) {
			Some(handle) => {
				if let Err(err) = self.transport.close(handle) {
					warn!(%slot, handle, error = %err, "close failed, slot kept");
					return;
				}
			}
			None => warn!(%slot, "registry entry already gone"),
		}

		self.registry.release_slot(slot);
		self.binding = Binding::Closed;
		debug!(%slot, "connection closed");
	}

	/// True while bound, or while unread bytes remain in the buffer.
	pub fn connected(&self) -> bool {
		self.status() || self.cursor < self.fill
	}

	/// True while the client holds a slot. Does not probe the peer.
	pub fn status(&self) -> bool {
		matches!(self.binding, Binding::Bound(_))
	}

	/// False only for a placeholder client.
	pub fn is_valid(&self) -> bool {
		self.binding != Binding::Invalid
	}

	/// Slot held by this client, if bound.
	pub fn slot(&self) -> Option<Slot> {
		match self.binding {
			Binding::Bound(slot) => Some(slot),
			_ => None,
		}
	}

	/// Port recorded in the registry for this client's slot.
	///
	/// For outbound clients this is the remote port passed to `connect`; for
	/// accepted ones it is the listener's port.
	pub fn remote_port(&self) -> Option<u16> {
		self.slot()
			.and_then(|slot| self.registry.entry(slot))
			.map(|entry| entry.port)
	}

	/// Unread bytes currently buffered.
	pub fn buffered(&self) -> usize {
		self.fill - self.cursor
	}

	/// Receive buffer capacity.
	pub fn capacity(&self) -> usize {
		self.rx.len()
	}

	/// Handle for the held slot. A slot whose registry entry vanished is
	/// treated as closed.
	fn live_handle(&mut self) -> Option<(Slot, RawHandle)> {
		let Binding::Bound(slot) = self.binding else {
			return None;
		};
		match self.registry.handle(slot) {
			Some(handle) => Some((slot, handle)),
			None => {
				warn!(%slot, "registry entry missing, treating client as closed");
				self.binding = Binding::Closed;
				None
			}
		}
	}
}

impl<T: Transport, R: SocketRegistry> Drop for BufferedSocketClient<T, R> {
	fn drop(&mut self) {
		if self.status() {
			debug!(slot = ?self.slot(), "dropping bound client");
			self.teardown();
		}
	}
}

impl<T: Transport, R: SocketRegistry> std::fmt::Debug for BufferedSocketClient<T, R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BufferedSocketClient")
			.field("binding", &self.binding)
			.field("cursor", &self.cursor)
			.field("fill", &self.fill)
			.field("capacity", &self.rx.len())
			.field("write_policy", &self.write_policy)
			.finish()
	}
}

/// Serves buffered bytes first, then refills through `available`.
///
/// Returns `WouldBlock` while connected with nothing pending and `Ok(0)`
/// once the connection is closed and the buffer is drained.
impl<T: Transport, R: SocketRegistry> std::io::Read for BufferedSocketClient<T, R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		let ready = match self.buffered() {
			0 => self.available(),
			n => n,
		};
		if ready == 0 {
			return if self.status() {
				Err(IoError::WouldBlock.into())
			} else {
				Ok(0)
			};
		}
		let n = ready.min(buf.len());
		buf[..n].copy_from_slice(&self.rx[self.cursor..self.cursor + n]);
		self.cursor += n;
		Ok(n)
	}
}

/// `Write::flush` is a no-op: it does **not** discard the receive buffer
/// the way the inherent [`flush`](BufferedSocketClient::flush) does.
impl<T: Transport, R: SocketRegistry> std::io::Write for BufferedSocketClient<T, R> {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		if buf.is_empty() {
			return Ok(0);
		}
		match BufferedSocketClient::write(self, buf) {
			0 => Err(IoError::NotConnected.into()),
			n => Ok(n),
		}
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use std::collections::VecDeque;

	/// Serves scripted receives and counts calls.
	#[derive(Default)]
	struct Script {
		recvs: RefCell<VecDeque<Vec<u8>>>,
		recv_calls: RefCell<usize>,
	}

	impl Transport for Script {
		fn open(&self) -> std::io::Result<RawHandle> {
			Ok(3)
		}
		fn connect(&self, _: RawHandle, _: SocketAddrV4) -> std::io::Result<()> {
			Ok(())
		}
		fn send(&self, _: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
			Ok(buf.len())
		}
		fn recv(&self, _: RawHandle, buf: &mut [u8]) -> std::io::Result<RecvResult> {
			*self.recv_calls.borrow_mut() += 1;
			match self.recvs.borrow_mut().pop_front() {
				Some(data) => {
					let n = data.len().min(buf.len());
					buf[..n].copy_from_slice(&data[..n]);
					Ok(RecvResult::Received(n))
				}
				None => Ok(RecvResult::WouldBlock),
			}
		}
		fn close(&self, _: RawHandle) -> std::io::Result<()> {
			Ok(())
		}
	}

	fn bound(script: Script) -> BufferedSocketClient<Script, SlotTable> {
		let mut client = BufferedSocketClient::new(script, SlotTable::new());
		client.connect(SocketAddrV4::new([192, 0, 2, 1], 7000)).unwrap();
		client
	}

	#[test]
	fn cursor_never_passes_fill_level() {
		let script = Script::default();
		script.recvs.borrow_mut().push_back(b"ab".to_vec());
		let mut client = bound(script);

		assert_eq!(client.available(), 2);
		let mut dst = [0xffu8; 4];
		assert_eq!(client.read(&mut dst), 4);
		assert_eq!(dst, [b'a', b'b', 0, 0]);
		assert_eq!(client.cursor, client.fill);
		assert_eq!(client.read_byte(), 0);
		assert_eq!(client.cursor, 2);
	}

	#[test]
	fn refill_is_clamped_to_capacity() {
		let script = Script::default();
		script.recvs.borrow_mut().push_back(vec![7; 32]);
		let mut client = bound(script).with_config(ClientConfig::new().rx_capacity(8));

		assert_eq!(client.capacity(), 8);
		assert_eq!(client.available(), 8);
		assert!(client.fill <= client.capacity());
	}

	#[test]
	fn peek_returns_the_next_unread_byte() {
		let script = Script::default();
		script.recvs.borrow_mut().push_back(b"xyz".to_vec());
		let mut client = bound(script);

		client.available();
		assert_eq!(client.peek(), b'x');
		assert_eq!(client.read_byte(), b'x');
		assert_eq!(client.peek(), b'y');
		assert_eq!(client.cursor, 1);
	}

	#[test]
	fn drained_buffer_triggers_exactly_one_refill() {
		let script = Script::default();
		script.recvs.borrow_mut().push_back(b"hi".to_vec());
		let mut client = bound(script);

		assert_eq!(client.available(), 2);
		assert_eq!(client.available(), 2);
		assert_eq!(*client.transport.recv_calls.borrow(), 1);

		client.read_byte();
		client.read_byte();
		assert_eq!(client.available(), 0);
		assert_eq!(*client.transport.recv_calls.borrow(), 2);
	}

	#[test]
	fn flush_zeroes_contents() {
		let script = Script::default();
		script.recvs.borrow_mut().push_back(b"secret".to_vec());
		let mut client = bound(script);

		client.available();
		client.flush();
		assert!(client.rx.iter().all(|&b| b == 0));
		assert_eq!(client.buffered(), 0);
		assert!(client.status());
	}

	#[test]
	fn stopped_client_cannot_reconnect() {
		let mut client = bound(Script::default());
		client.stop();
		let err = client.connect(SocketAddrV4::new([192, 0, 2, 1], 7000)).unwrap_err();
		assert!(err.to_string().contains("stopped"));
		assert_eq!(client.registry.in_use(), 0);
	}
}
