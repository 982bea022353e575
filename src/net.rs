//! LAN address discovery, used for display only.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Best guess at this machine's address on the local network.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// outbound interface. The target is in TEST-NET-1.
pub fn local_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// URL clients on the network should open for a bound address.
pub fn display_url(bound: SocketAddr) -> String {
    let ip = if bound.ip().is_unspecified() {
        local_address().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    } else {
        bound.ip()
    };
    format!("http://{}", SocketAddr::new(ip, bound.port()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_url_specific_address() {
        let addr: SocketAddr = "192.168.1.20:9999".parse().unwrap();
        assert_eq!(display_url(addr), "http://192.168.1.20:9999");
    }

    #[test]
    fn test_display_url_unspecified_address() {
        let addr: SocketAddr = "0.0.0.0:9999".parse().unwrap();
        let url = display_url(addr);
        assert!(url.starts_with("http://"));
        assert!(url.ends_with(":9999"));
        assert!(!url.contains("0.0.0.0"));
    }

    #[test]
    fn test_display_url_ipv6() {
        let addr: SocketAddr = "[fe80::1]:9999".parse().unwrap();
        assert_eq!(display_url(addr), "http://[fe80::1]:9999");
    }
}
