use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::net::{TcpStream, UdpSocket};

use crate::connection::Connection;

pub(crate) const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Relays a raw query to the upstream resolver and returns its raw response.
///
/// The transport follows the client's: a truncated UDP response is passed back as is,
/// so that the client retries over TCP itself.
pub(crate) async fn forward_to_upstream(
    query: &[u8],
    upstream_resolver: SocketAddr,
    use_tcp: bool,
) -> anyhow::Result<Vec<u8>> {
    tokio::time::timeout(UPSTREAM_TIMEOUT, exchange(query, upstream_resolver, use_tcp))
        .await
        .with_context(|| format!("upstream resolver didn't respond within {:?}", UPSTREAM_TIMEOUT))?
}

async fn exchange(query: &[u8], upstream_resolver: SocketAddr, use_tcp: bool) -> anyhow::Result<Vec<u8>> {
    let mut connection = if use_tcp {
        Connection::Tcp(
            TcpStream::connect(upstream_resolver)
                .await
                .context("TCP: error while connecting to the upstream resolver")?,
        )
    } else {
        let bind_addr: SocketAddr = if upstream_resolver.is_ipv4() {
            "0.0.0.0:0".parse()?
        } else {
            "[::]:0".parse()?
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .context("UDP: unable to bind a socket")?;
        socket
            .connect(upstream_resolver)
            .await
            .context("UDP: error while connecting to the upstream resolver")?;
        Connection::Udp((Arc::new(socket), None))
    };

    connection
        .send_encoded_packet(query)
        .await
        .context("error while forwarding the query")?;

    let mut response = Vec::new();
    loop {
        connection
            .read(&mut response)
            .await
            .context("error while reading the response")?;

        // Skip stray datagrams that don't answer this query
        if response.get(..2) == query.get(..2) {
            break Ok(response);
        }
        if connection.is_tcp() {
            anyhow::bail!("upstream response ID doesn't match the query");
        }
        tracing::debug!(resolver = ?upstream_resolver, "Ignoring an upstream response with a mismatched ID");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn forward_over_udp() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0; 512];
            let (len, from) = upstream.recv_from(&mut buf).await.unwrap();
            // A stray reply first, then the real one
            upstream.send_to(&[0xff, 0xff, 0x80, 0x00], from).await.unwrap();
            let mut reply = buf[..len].to_vec();
            reply[2] |= 0x80;
            upstream.send_to(&reply, from).await.unwrap();
        });

        let response = forward_to_upstream(&[0x12, 0x34, 0x01, 0x00], upstream_addr, false)
            .await
            .expect("shouldn't have failed");
        assert_eq!(response, [0x12, 0x34, 0x81, 0x00]);
    }

    #[tokio::test]
    async fn forward_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let len = stream.read_u16().await.unwrap() as usize;
            let mut buf = vec![0; len];
            stream.read_exact(&mut buf).await.unwrap();
            buf[2] |= 0x80;
            stream.write_u16(buf.len() as u16).await.unwrap();
            stream.write_all(&buf).await.unwrap();
        });

        let response = forward_to_upstream(&[0xab, 0xcd, 0x01, 0x00], upstream_addr, true)
            .await
            .expect("shouldn't have failed");
        assert_eq!(response, [0xab, 0xcd, 0x81, 0x00]);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_upstream_times_out() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        let err = forward_to_upstream(&[0x12, 0x34, 0x01, 0x00], upstream_addr, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("didn't respond"), "{:#}", err);
        drop(upstream);
    }
}
