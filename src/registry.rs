//! Process-wide socket slot registry.
//!
//! A slot is a small integer naming one live connection. The registry
//! records, per slot, the transport handle, the port and the role that
//! claimed it. Clients claim a slot on connect and release it on
//! teardown; the listener claims one per accepted connection.

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::transport::RawHandle;

/// Number of slots in a [`SlotTable`] built with `Default`.
pub const DEFAULT_SLOT_COUNT: usize = 8;

/// Index of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u8);

impl Slot {
	/// Reserved index marking a deliberately invalid client.
	///
	/// No registry ever hands this value out.
	pub const INVALID: Slot = Slot(u8::MAX);

	pub fn new(index: u8) -> Self {
		Slot(index)
	}

	pub fn index(self) -> u8 {
		self.0
	}
}

impl std::fmt::Display for Slot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Who owns the connection behind a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
	/// Outbound connection opened by `BufferedSocketClient::connect`.
	TcpClient,
	/// Inbound connection handed over by a listener.
	TcpServer,
}

/// What the registry knows about a bound slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
	pub handle: RawHandle,
	pub port: u16,
	pub role: SlotRole,
}

/// The registry boundary used by clients and listeners.
///
/// `acquire_free_slot` must be an atomic claim: two callers never receive
/// the same slot until it has been released.
pub trait SocketRegistry {
	/// Claims an unused slot, or None when the table is exhausted.
	fn acquire_free_slot(&self) -> Option<Slot>;

	/// Publishes the connection details for a claimed slot.
	fn set_entry(&self, slot: Slot, handle: RawHandle, port: u16, role: SlotRole);

	/// Transport handle recorded for `slot`, if it is bound.
	fn handle(&self, slot: Slot) -> Option<RawHandle> {
		self.entry(slot).map(|entry| entry.handle)
	}

	/// Full entry recorded for `slot`, if it is bound.
	fn entry(&self, slot: Slot) -> Option<SlotEntry>;

	/// Returns `slot` to the free pool, clearing handle, port and role.
	fn release_slot(&self, slot: Slot);
}

impl<R: SocketRegistry + ?Sized> SocketRegistry for std::sync::Arc<R> {
	fn acquire_free_slot(&self) -> Option<Slot> {
		(**self).acquire_free_slot()
	}

	fn set_entry(&self, slot: Slot, handle: RawHandle, port: u16, role: SlotRole) {
		(**self).set_entry(slot, handle, port, role)
	}

	fn handle(&self, slot: Slot) -> Option<RawHandle> {
		(**self).handle(slot)
	}

	fn entry(&self, slot: Slot) -> Option<SlotEntry> {
		(**self).entry(slot)
	}

	fn release_slot(&self, slot: Slot) {
		(**self).release_slot(slot)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
	Free,
	/// Claimed by `acquire_free_slot`, not yet published.
	Reserved,
	Bound(SlotEntry),
}

/// Fixed-size slot table guarded by a single lock.
///
/// Share it between clients with `Arc<SlotTable>`.
#[derive(Debug)]
pub struct SlotTable {
	slots: Mutex<Vec<SlotState>>,
}

impl Default for SlotTable {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_SLOT_COUNT)
	}
}

impl SlotTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a table with `capacity` slots.
	///
	/// Capacity is capped below [`Slot::INVALID`] so the invalid index is
	/// never issued.
	pub fn with_capacity(capacity: usize) -> Self {
		let capacity = capacity.min(Slot::INVALID.0 as usize);
		Self {
			slots: Mutex::new(vec![SlotState::Free; capacity]),
		}
	}

	/// Total number of slots.
	pub fn capacity(&self) -> usize {
		self.slots.lock().len()
	}

	/// Number of slots currently reserved or bound.
	pub fn in_use(&self) -> usize {
		self.slots
			.lock()
			.iter()
			.filter(|state| **state != SlotState::Free)
			.count()
	}
}

impl SocketRegistry for SlotTable {
	fn acquire_free_slot(&self) -> Option<Slot> {
		let mut slots = self.slots.lock();
		let index = slots.iter().position(|state| *state == SlotState::Free)?;
		slots[index] = SlotState::Reserved;
		trace!(slot = index, "slot reserved");
		Some(Slot(index as u8))
	}

	fn set_entry(&self, slot: Slot, handle: RawHandle, port: u16, role: SlotRole) {
		let mut slots = self.slots.lock();
		if let Some(state) = slots.get_mut(slot.0 as usize) {
			*state = SlotState::Bound(SlotEntry { handle, port, role });
			debug!(%slot, handle, port, ?role, "slot bound");
		}
	}

	fn entry(&self, slot: Slot) -> Option<SlotEntry> {
		match self.slots.lock().get(slot.0 as usize) {
			Some(SlotState::Bound(entry)) => Some(*entry),
			_ => None,
		}
	}

	fn release_slot(&self, slot: Slot) {
		let mut slots = self.slots.lock();
		if let Some(state) = slots.get_mut(slot.0 as usize) {
			*state = SlotState::Free;
			debug!(%slot, "slot released");
		}
	}
}
