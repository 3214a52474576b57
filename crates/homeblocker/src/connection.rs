use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpStream, UdpSocket};

use crate::MAX_UDP_PACKET_SIZE;

/// An enum that abstracts the underlying connection to simplify the logic inside the resolver
pub enum Connection {
    Tcp(TcpStream),
    /// A shared listening socket with the client's address, or a connected socket without one
    Udp((Arc<UdpSocket>, Option<SocketAddr>)),
}

impl Connection {
    pub async fn send_encoded_packet(&mut self, src: &[u8]) -> anyhow::Result<()> {
        match self {
            Connection::Tcp(socket) => {
                let length: u16 = src
                    .len()
                    .try_into()
                    .context("TCP: DNS packet doesn't fit into a single message")?;
                socket
                    .write_all(&length.to_be_bytes())
                    .await
                    .context("TCP: error while sending packet's length")?;
                socket
                    .write_all(src)
                    .await
                    .context("TCP: error while sending a DNS packet")?;
            }
            Connection::Udp((socket, addr)) => {
                if let Some(addr) = addr {
                    socket
                        .send_to(src, *addr)
                        .await
                        .with_context(|| format!("UDP: error while sending a DNS packet to {}", addr))?;
                } else {
                    socket
                        .send(src)
                        .await
                        .context("UDP: error while sending a DNS packet")?;
                }
            }
        };

        Ok(())
    }

    /// Reads a single DNS message into `dst`, replacing its contents
    pub async fn read(&mut self, dst: &mut Vec<u8>) -> anyhow::Result<usize> {
        let packet_length = match self {
            Connection::Tcp(socket) => {
                let length = socket
                    .read_u16()
                    .await
                    .context("TCP: error while reading packet's length")? as usize;
                dst.resize(length, 0);
                socket
                    .read_exact(dst)
                    .await
                    .context("TCP: error while reading a packet")?;
                length
            }
            Connection::Udp((socket, _)) => {
                dst.resize(MAX_UDP_PACKET_SIZE, 0);
                let length = socket.recv(dst).await.context("UDP: error while reading a packet")?;
                dst.truncate(length);
                length
            }
        };

        Ok(packet_length)
    }

    pub fn get_client_addr(&self) -> anyhow::Result<IpAddr> {
        match self {
            Connection::Tcp(socket) => socket
                .peer_addr()
                .map(|socket_addr| socket_addr.ip())
                .context("bug: TCP socket is not connected?"),
            Connection::Udp((socket, addr)) => addr
                .map(|socket_addr| socket_addr.ip())
                .or_else(|| socket.peer_addr().ok().map(|socket_addr| socket_addr.ip()))
                .context("bug: UDP socket is not connected and explicit addr is missing?"),
        }
    }

    pub fn is_tcp(&self) -> bool {
        matches!(self, Connection::Tcp(_))
    }
}
