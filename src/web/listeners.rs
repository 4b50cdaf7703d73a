use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;

/// Bind the HTTP listener. `*` means every interface, preferring an IPv6
/// dual-stack socket and falling back to IPv4.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(String, TcpListener)> {
    if host == "*" {
        return create_wildcard_listener(port);
    }

    let addr = format!("{}:{}", host, port);
    tracing::info!("Attempting to bind server to {}...", addr);

    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    Ok((local_addr.to_string(), listener))
}

fn create_wildcard_listener(port: u16) -> std::io::Result<(String, TcpListener)> {
    let ipv6_addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    tracing::info!(
        "Attempting to bind server to {}... (IPv6 + IPv4 dual-stack)",
        ipv6_addr
    );
    match bind_socket(ipv6_addr) {
        Ok(listener) => return Ok((ipv6_addr.to_string(), listener)),
        Err(e) => tracing::warn!("Failed to bind IPv6 listener: {}. Attempting IPv4 only.", e),
    }

    let ipv4_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    tracing::info!("Attempting to bind server to {}... (IPv4)", ipv4_addr);
    let listener = bind_socket(ipv4_addr)?;

    Ok((ipv4_addr.to_string(), listener))
}

fn bind_socket(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    if addr.is_ipv6() {
        // Some systems refuse dual-stack; an IPv6-only socket is still usable.
        if let Err(e) = socket.set_only_v6(false) {
            tracing::warn!("Failed to set dual-stack mode for IPv6 socket: {}", e);
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;

    TcpListener::from_std(socket.into())
}
