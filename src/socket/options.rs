use crate::error::{SocketError, errno};
use crate::transport::RawHandle;

/// Sets an integer-valued socket option.
fn set_int_option(
	handle: RawHandle,
	level: libc::c_int,
	name: libc::c_int,
	val: libc::c_int,
	option: &'static str,
) -> std::io::Result<()> {
	let result = unsafe {
		libc::setsockopt(
			handle,
			level,
			name,
			&val as *const _ as *const libc::c_void,
			std::mem::size_of::<libc::c_int>() as libc::socklen_t,
		)
	};
	if result == -1 {
		Err(SocketError::SetOption { errno: errno(), option }.into())
	} else {
		Ok(())
	}
}

/// Sets SO_REUSEADDR on a socket.
///
/// Lets a restarted listener bind a port still in TIME_WAIT.
pub fn set_reuse_addr(handle: RawHandle, enable: bool) -> std::io::Result<()> {
	set_int_option(handle, libc::SOL_SOCKET, libc::SO_REUSEADDR, enable as libc::c_int, "SO_REUSEADDR")
}

/// Sets TCP_NODELAY on a socket.
///
/// Disables Nagle's algorithm so single-byte writes leave immediately.
pub fn set_tcp_nodelay(handle: RawHandle, enable: bool) -> std::io::Result<()> {
	set_int_option(handle, libc::IPPROTO_TCP, libc::TCP_NODELAY, enable as libc::c_int, "TCP_NODELAY")
}

/// Enables TCP keep-alive (SO_KEEPALIVE).
///
/// The kernel probes idle connections, so a dead peer eventually surfaces
/// as a send or recv error instead of silence.
pub fn set_keepalive(handle: RawHandle, enable: bool) -> std::io::Result<()> {
	set_int_option(handle, libc::SOL_SOCKET, libc::SO_KEEPALIVE, enable as libc::c_int, "SO_KEEPALIVE")
}
