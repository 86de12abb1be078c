//! Address family and socket address types.
//!
//! Only IPv4 is supported: the client speaks TCP over `AF_INET`.

mod ipv4;
pub use self::ipv4::{Ipv4, SocketAddrV4};

/// Trait for address family markers.
///
/// Each type implementing this trait represents an address family
/// that can be passed to the `socket()` syscall.
pub trait Domain {
	/// Address type used with this family.
	type Addr;
	/// Returns the libc constant for this address family.
	fn raw() -> libc::c_int;
}

/// Trait for address types that can be converted to raw sockaddr for syscalls.
pub trait ToSockAddr {
	/// Calls the provided closure with a pointer to the raw sockaddr and its size.
	/// Returns None if the address cannot be represented.
	fn with_raw<F, R>(&self, f: F) -> Option<R>
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R;
}
/*
The closure keeps the stack-allocated sockaddr_in alive for exactly
as long as the syscall needs the pointer.
 */

/// Trait for address types that can be created from raw sockaddr.
pub trait FromSockAddr: Sized {
	/// Creates address from raw sockaddr storage.
	///
	/// # Safety
	/// `addr` must point to at least `len` readable bytes.
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self>;
}

impl FromSockAddr for SocketAddrV4 {
	unsafe fn from_sockaddr(addr: *const libc::sockaddr, len: libc::socklen_t) -> Option<Self> {
		if len < std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t {
			return None;
		}
		let raw = unsafe { &*(addr as *const libc::sockaddr_in) };
		if raw.sin_family != libc::AF_INET as libc::sa_family_t {
			return None;
		}
		Some(Self::from_raw(raw))
	}
}
