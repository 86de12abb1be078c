#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use slotlane::{IoError, RawHandle, RecvResult, SocketAddrV4, SocketError, Transport};

/// What the next `recv` on a [`MockTransport`] returns.
#[derive(Debug, Clone)]
pub enum ScriptedRecv {
	Data(Vec<u8>),
	WouldBlock,
	Error,
}

#[derive(Debug, Default)]
pub struct MockState {
	pub next_handle: RawHandle,
	pub fail_open: bool,
	pub fail_connect: bool,
	pub fail_close: bool,
	pub fail_send: bool,
	/// Accept at most this many bytes per send.
	pub send_limit: Option<usize>,
	pub recv_script: VecDeque<ScriptedRecv>,

	pub opened: Vec<RawHandle>,
	pub connects: Vec<(RawHandle, SocketAddrV4)>,
	pub closed: Vec<RawHandle>,
	pub sent: Vec<u8>,
	pub send_calls: usize,
	pub recv_calls: usize,
}

/// Scripted transport that records every call.
#[derive(Debug, Default)]
pub struct MockTransport {
	state: Mutex<MockState>,
}

impl MockTransport {
	pub fn new() -> Arc<Self> {
		let mock = Self::default();
		mock.state().next_handle = 10;
		Arc::new(mock)
	}

	pub fn state(&self) -> MutexGuard<'_, MockState> {
		self.state.lock()
	}

	pub fn push_recv(&self, recv: ScriptedRecv) {
		self.state().recv_script.push_back(recv);
	}
}

impl Transport for MockTransport {
	fn open(&self) -> std::io::Result<RawHandle> {
		let mut state = self.state();
		if state.fail_open {
			return Err(SocketError::Create { errno: libc::EMFILE }.into());
		}
		let handle = state.next_handle;
		state.next_handle += 1;
		state.opened.push(handle);
		Ok(handle)
	}

	fn connect(&self, handle: RawHandle, addr: SocketAddrV4) -> std::io::Result<()> {
		let mut state = self.state();
		state.connects.push((handle, addr));
		if state.fail_connect {
			return Err(SocketError::Connect { errno: libc::ECONNREFUSED, addr: addr.to_string() }.into());
		}
		Ok(())
	}

	fn send(&self, _handle: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
		let mut state = self.state();
		state.send_calls += 1;
		if state.fail_send {
			return Err(IoError::Write { errno: libc::EPIPE }.into());
		}
		let n = state.send_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
		state.sent.extend_from_slice(&buf[..n]);
		Ok(n)
	}

	fn recv(&self, _handle: RawHandle, buf: &mut [u8]) -> std::io::Result<RecvResult> {
		let mut state = self.state();
		state.recv_calls += 1;
		match state.recv_script.pop_front() {
			Some(ScriptedRecv::Data(data)) => {
				let n = data.len().min(buf.len());
				buf[..n].copy_from_slice(&data[..n]);
				Ok(RecvResult::Received(n))
			}
			Some(ScriptedRecv::Error) => Err(IoError::Read { errno: libc::ECONNRESET }.into()),
			Some(ScriptedRecv::WouldBlock) | None => Ok(RecvResult::WouldBlock),
		}
	}

	fn close(&self, handle: RawHandle) -> std::io::Result<()> {
		let mut state = self.state();
		if state.fail_close {
			return Err(SocketError::Close { errno: libc::EINTR, handle }.into());
		}
		state.closed.push(handle);
		Ok(())
	}
}

#[derive(Debug, Default)]
struct Endpoint {
	peer: Option<RawHandle>,
	inbound: VecDeque<u8>,
	closed: bool,
}

#[derive(Debug, Default)]
struct Net {
	next_handle: RawHandle,
	endpoints: HashMap<RawHandle, Endpoint>,
	pending: VecDeque<RawHandle>,
}

/// In-memory stream pairs. `connect` creates the server-side endpoint and
/// queues it for [`LoopbackNet::accept`].
#[derive(Debug, Default)]
pub struct LoopbackNet {
	net: Mutex<Net>,
	/// Largest chunk a single send moves, to force several refills.
	pub max_segment: Option<usize>,
}

impl LoopbackNet {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn with_segment(max_segment: usize) -> Arc<Self> {
		Arc::new(Self { max_segment: Some(max_segment), ..Self::default() })
	}

	/// Server-side handle of the oldest unaccepted connection.
	pub fn accept(&self) -> Option<RawHandle> {
		self.net.lock().pending.pop_front()
	}
}

impl Transport for LoopbackNet {
	fn open(&self) -> std::io::Result<RawHandle> {
		let mut net = self.net.lock();
		net.next_handle += 1;
		let handle = net.next_handle;
		net.endpoints.insert(handle, Endpoint::default());
		Ok(handle)
	}

	fn connect(&self, handle: RawHandle, _addr: SocketAddrV4) -> std::io::Result<()> {
		let mut net = self.net.lock();
		net.next_handle += 1;
		let server = net.next_handle;
		net.endpoints.insert(server, Endpoint { peer: Some(handle), ..Endpoint::default() });
		if let Some(client) = net.endpoints.get_mut(&handle) {
			client.peer = Some(server);
		}
		net.pending.push_back(server);
		Ok(())
	}

	fn send(&self, handle: RawHandle, buf: &[u8]) -> std::io::Result<usize> {
		let mut net = self.net.lock();
		let Some(peer) = net.endpoints.get(&handle).and_then(|e| e.peer) else {
			return Err(IoError::Write { errno: libc::ENOTCONN }.into());
		};
		let peer = match net.endpoints.get_mut(&peer) {
			Some(endpoint) if !endpoint.closed => endpoint,
			_ => return Err(IoError::Write { errno: libc::EPIPE }.into()),
		};
		let n = self.max_segment.map_or(buf.len(), |max| max.min(buf.len()));
		peer.inbound.extend(&buf[..n]);
		Ok(n)
	}

	fn recv(&self, handle: RawHandle, buf: &mut [u8]) -> std::io::Result<RecvResult> {
		let mut net = self.net.lock();
		let peer_closed = net
			.endpoints
			.get(&handle)
			.and_then(|e| e.peer)
			.and_then(|p| net.endpoints.get(&p))
			.is_none_or(|e| e.closed);
		let Some(endpoint) = net.endpoints.get_mut(&handle) else {
			return Err(IoError::Read { errno: libc::EBADF }.into());
		};
		if endpoint.inbound.is_empty() {
			return if peer_closed {
				Err(IoError::ConnectionClosed.into())
			} else {
				Ok(RecvResult::WouldBlock)
			};
		}
		let n = endpoint.inbound.len().min(buf.len());
		for (slot, byte) in buf.iter_mut().zip(endpoint.inbound.drain(..n)) {
			*slot = byte;
		}
		Ok(RecvResult::Received(n))
	}

	fn close(&self, handle: RawHandle) -> std::io::Result<()> {
		let mut net = self.net.lock();
		match net.endpoints.get_mut(&handle) {
			Some(endpoint) => {
				endpoint.closed = true;
				Ok(())
			}
			None => Err(SocketError::Close { errno: libc::EBADF, handle }.into()),
		}
	}
}
