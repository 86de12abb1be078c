/// Receive buffer size used unless configured otherwise: one TCP segment
/// on a 1500-byte MTU link.
pub const DEFAULT_RX_CAPACITY: usize = 1460;

/// How `write` treats a send that the transport only partly accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
	/// One `send` per write; anything short of the full length is treated
	/// as a dead connection.
	#[default]
	Exact,
	/// Re-issue `send` for the unsent tail until everything is accepted.
	/// Errors and zero-byte sends are still fatal.
	Complete,
}

/// Per-client configuration.
///
/// # Example
/// ```ignore
/// use slotlane::{ClientConfig, WritePolicy};
///
/// let config = ClientConfig::new()
///     .rx_capacity(4096)
///     .write_policy(WritePolicy::Complete);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
	pub rx_capacity: usize,
	pub write_policy: WritePolicy,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			rx_capacity: DEFAULT_RX_CAPACITY,
			write_policy: WritePolicy::Exact,
		}
	}
}

impl ClientConfig {
	pub fn new() -> Self {
		Self::default()
	}

	/// Receive buffer capacity in bytes. Clamped to at least 1.
	pub fn rx_capacity(mut self, bytes: usize) -> Self {
		self.rx_capacity = bytes.max(1);
		self
	}

	pub fn write_policy(mut self, policy: WritePolicy) -> Self {
		self.write_policy = policy;
		self
	}
}
