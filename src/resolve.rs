//! Hostname to IPv4 resolution.

use std::ffi::{CStr, CString};

use tracing::debug;

use crate::addr::{FromSockAddr, SocketAddrV4};
use crate::error::SocketError;

/// Turns a hostname into an IPv4 address.
pub trait Resolver {
	fn resolve(&self, host: &str) -> std::io::Result<[u8; 4]>;
}

/// Any `Fn(&str) -> io::Result<[u8; 4]>` is a resolver, which keeps fixed
/// host tables in tests to a closure.
impl<F> Resolver for F
where
	F: Fn(&str) -> std::io::Result<[u8; 4]>,
{
	fn resolve(&self, host: &str) -> std::io::Result<[u8; 4]> {
		self(host)
	}
}

/// Resolver backed by `getaddrinfo(3)`.
///
/// Dotted-quad literals are returned as-is without a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
	fn resolve(&self, host: &str) -> std::io::Result<[u8; 4]> {
		if let Some(ip) = SocketAddrV4::parse_ip(host) {
			return Ok(ip);
		}

		let failed = |reason: String| SocketError::Resolve { host: host.to_string(), reason };

		let node = CString::new(host).map_err(|_| failed("hostname contains a NUL byte".into()))?;

		let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
		hints.ai_family = libc::AF_INET;
		hints.ai_socktype = libc::SOCK_STREAM;

		let mut list: *mut libc::addrinfo = std::ptr::null_mut();
		let rc = unsafe { libc::getaddrinfo(node.as_ptr(), std::ptr::null(), &hints, &mut list) };
		if rc != 0 {
			let reason = unsafe { CStr::from_ptr(libc::gai_strerror(rc)) }
				.to_string_lossy()
				.into_owned();
			return Err(failed(reason).into());
		}

		let mut found = None;
		let mut cursor = list;
		while !cursor.is_null() {
			let info = unsafe { &*cursor };
			if info.ai_family == libc::AF_INET && !info.ai_addr.is_null() {
				found = unsafe { SocketAddrV4::from_sockaddr(info.ai_addr, info.ai_addrlen) };
				if found.is_some() {
					break;
				}
			}
			cursor = info.ai_next;
		}
		unsafe { libc::freeaddrinfo(list) };

		let addr = found.ok_or_else(|| failed("no IPv4 address".into()))?;
		debug!(host, ip = ?addr.ip(), "resolved");
		Ok(addr.ip())
	}
}
