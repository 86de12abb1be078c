use crate::addr::{Domain, ToSockAddr};

/// IPv4 address family marker.
///
/// Sockets with this domain use 32-bit addresses (e.g., 192.168.1.1).
pub struct Ipv4;

impl Domain for Ipv4 {
	type Addr = SocketAddrV4;

	#[inline]
	fn raw() -> libc::c_int {
		libc::AF_INET
	}
}

/// IPv4 socket address (IP + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketAddrV4 {
	ip: [u8; 4],
	port: u16,
}

impl SocketAddrV4 {
	/// Creates a new IPv4 address.
	pub fn new(ip: [u8; 4], port: u16) -> Self {
		Self { ip, port }
	}

	/// Creates from an IP tuple and port.
	/// Example: `SocketAddrV4::from((192, 168, 1, 1), 8080)`
	pub fn from(ip: (u8, u8, u8, u8), port: u16) -> Self {
		Self {
			ip: [ip.0, ip.1, ip.2, ip.3],
			port,
		}
	}

	/// Parses a dotted-quad literal such as `"10.0.0.7"`.
	///
	/// Returns None for anything else, hostnames included.
	pub fn parse_ip(text: &str) -> Option<[u8; 4]> {
		text.parse::<std::net::Ipv4Addr>().ok().map(|ip| ip.octets())
	}

	/// Creates from raw sockaddr_in.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> Self {
		Self {
			ip: raw.sin_addr.s_addr.to_ne_bytes(),
			port: u16::from_be(raw.sin_port),
		}
	}

	/// Returns the IP bytes.
	pub fn ip(&self) -> [u8; 4] {
		self.ip
	}

	/// Returns the port.
	pub fn port(&self) -> u16 {
		self.port
	}

	/// Converts to the raw sockaddr_in for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in {
		let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		raw.sin_family = libc::AF_INET as libc::sa_family_t;
		raw.sin_port = self.port.to_be();
		raw.sin_addr = libc::in_addr {
			s_addr: u32::from_ne_bytes(self.ip),
		};
		raw
	}
}

impl std::fmt::Display for SocketAddrV4 {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let [a, b, c, d] = self.ip;
		write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
	}
}

impl ToSockAddr for SocketAddrV4 {
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		let raw = self.to_raw();
		let ptr = &raw as *const _ as *const libc::sockaddr;
		let len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
		Some(f(ptr, len))
	}
}

/*
sin_addr holds the address in network byte order, which is exactly the
in-memory order of the octets, so from_ne_bytes/to_ne_bytes keep
[192, 0, 2, 1] as 192.0.2.1 on any host endianness.
 */
