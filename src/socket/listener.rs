use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use tracing::{debug, info, warn};

use crate::addr::{Domain, FromSockAddr, Ipv4, SocketAddrV4, ToSockAddr};
use crate::client::{BufferedSocketClient, ClientConfig};
use crate::error::{SocketError, errno};
use crate::registry::{SlotRole, SocketRegistry};
use crate::transport::Transport;
use super::{SockType, Stream, set_reuse_addr};

/// A listening IPv4 socket that hands out server-role clients.
///
/// Every accepted connection claims a slot in the shared registry before
/// it is wrapped, so inbound and outbound clients draw from the same pool.
pub struct SlotListener<T: Transport + Clone, R: SocketRegistry + Clone> {
    fd: OwnedFd,
    transport: T,
    registry: R,
    config: ClientConfig,
}

impl<T: Transport + Clone, R: SocketRegistry + Clone> SlotListener<T, R> {
    /// Binds `addr` and starts listening.
    ///
    /// `SO_REUSEADDR` is always set. Port 0 picks an ephemeral port; read
    /// it back with [`local_addr`](Self::local_addr).
    pub fn bind(
        transport: T,
        registry: R,
        addr: SocketAddrV4,
        backlog: i32,
    ) -> std::io::Result<Self> {
        let fd = unsafe {
            libc::socket(Ipv4::raw(), Stream::raw() | libc::SOCK_CLOEXEC, libc::IPPROTO_TCP)
        };
        if fd == -1 {
            return Err(SocketError::Create { errno: errno() }.into());
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        set_reuse_addr(fd.as_raw_fd(), true)?;

        let result = addr.with_raw(|ptr, len| unsafe {
            libc::bind(fd.as_raw_fd(), ptr, len)
        });
        match result {
            Some(-1) => {
                return Err(SocketError::Bind {
                    errno: errno(),
                    addr: addr.to_string(),
                }.into());
            }
            Some(_) => {}
            None => {
                return Err(SocketError::InvalidAddress {
                    reason: "address not representable",
                }.into());
            }
        }

        if unsafe { libc::listen(fd.as_raw_fd(), backlog) } == -1 {
            return Err(SocketError::Listen { errno: errno(), backlog }.into());
        }

        let listener = Self {
            fd,
            transport,
            registry,
            config: ClientConfig::default(),
        };
        info!(addr = %listener.local_addr()?, backlog, "listening");
        Ok(listener)
    }

    /// Configuration given to every client this listener accepts.
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the bound local address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddrV4> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let result = unsafe {
            libc::getsockname(
                self.fd.as_raw_fd(),
                &mut storage as *mut _ as *mut libc::sockaddr,
                &mut len,
            )
        };

        if result == -1 {
            return Err(SocketError::GetOption { errno: errno(), option: "SO_SOCKNAME" }.into());
        }

        unsafe {
            SocketAddrV4::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len)
                .ok_or_else(|| SocketError::InvalidAddress { reason: "invalid local address" }.into())
        }
    }

    /// Blocks until a peer connects, then returns it as a bound client.
    ///
    /// The registry entry records the accepted handle, the listener's local
    /// port and `SlotRole::TcpServer`. When the registry is exhausted the
    /// connection is closed again and `NoSlotAvailable` is returned.
    pub fn accept(&self) -> std::io::Result<BufferedSocketClient<T, R>> {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;

        let fd = unsafe {
            libc::accept4(
                self.fd.as_raw_fd(),
                &mut storage as *mut _ as *mut libc::sockaddr,
                &mut len,
                libc::SOCK_CLOEXEC,
            )
        };
        if fd == -1 {
            return Err(SocketError::Accept { errno: errno() }.into());
        }

        let peer = unsafe {
            SocketAddrV4::from_sockaddr(&storage as *const _ as *const libc::sockaddr, len)
        };

        let Some(slot) = self.registry.acquire_free_slot() else {
            warn!(?peer, "no free slot, dropping accepted connection");
            if let Err(err) = self.transport.close(fd) {
                warn!(fd, error = %err, "close of rejected connection failed");
            }
            return Err(SocketError::NoSlotAvailable.into());
        };

        let port = self.local_addr().map(|addr| addr.port()).unwrap_or(0);
        self.registry.set_entry(slot, fd, port, SlotRole::TcpServer);
        debug!(%slot, fd, ?peer, "connection accepted");

        Ok(BufferedSocketClient::accepted(self.transport.clone(), self.registry.clone(), slot)
            .with_config(self.config))
    }
}

impl<T: Transport + Clone, R: SocketRegistry + Clone> AsRawFd for SlotListener<T, R> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.fd.as_raw_fd()
    }
}
