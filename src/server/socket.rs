use std::mem;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::fd::{FromRawFd, RawFd};

/// Binds the listening socket with SO_REUSEADDR and an explicit backlog.
///
/// Built on raw libc calls because address reuse must be set before bind
/// and the backlog must be chosen at listen time, neither of which
/// `std::net::TcpListener::bind` exposes.
pub fn bind_listener(host: &str, port: u16, backlog: i32) -> anyhow::Result<TcpListener> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("no address found for {}:{}", host, port))?;

    let fd = match addr {
        SocketAddr::V4(v4) => unsafe {
            let mut sa: libc::sockaddr_in = mem::zeroed();
            sa.sin_family = libc::AF_INET as libc::sa_family_t;
            sa.sin_port = v4.port().to_be();
            sa.sin_addr.s_addr = u32::from(*v4.ip()).to_be();
            open_and_bind(
                libc::AF_INET,
                &sa as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                backlog,
            )?
        },
        SocketAddr::V6(v6) => unsafe {
            let mut sa: libc::sockaddr_in6 = mem::zeroed();
            sa.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sa.sin6_port = v6.port().to_be();
            sa.sin6_addr.s6_addr = v6.ip().octets();
            open_and_bind(
                libc::AF_INET6,
                &sa as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                backlog,
            )?
        },
    };

    Ok(unsafe { TcpListener::from_raw_fd(fd) })
}

unsafe fn open_and_bind(
    family: libc::c_int,
    sa: *const libc::sockaddr,
    sa_len: libc::socklen_t,
    backlog: i32,
) -> std::io::Result<RawFd> {
    unsafe {
        let fd = libc::socket(family, libc::SOCK_STREAM | libc::SOCK_CLOEXEC, 0);
        if fd < 0 {
            return Err(std::io::Error::last_os_error());
        }

        let one: libc::c_int = 1;
        if libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &one as *const _ as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        ) < 0
        {
            return Err(close_on_error(fd));
        }

        if libc::bind(fd, sa, sa_len) < 0 {
            return Err(close_on_error(fd));
        }

        if libc::listen(fd, backlog) < 0 {
            return Err(close_on_error(fd));
        }

        Ok(fd)
    }
}

unsafe fn close_on_error(fd: RawFd) -> std::io::Error {
    let err = std::io::Error::last_os_error();
    unsafe {
        libc::close(fd);
    }
    err
}

/// Clears FD_CLOEXEC so worker processes inherit the socket across exec.
pub fn clear_cloexec(fd: RawFd) -> std::io::Result<()> {
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags < 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFD, flags & !libc::FD_CLOEXEC) < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}
