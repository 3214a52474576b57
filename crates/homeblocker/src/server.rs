use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::resolver::resolve_query;
use crate::{Connection, State, MAX_UDP_PACKET_SIZE};

type HandlerResult = anyhow::Result<()>;

const TCP_READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DnsServer {
    udp_socket: Arc<UdpSocket>,
    tcp_listener: Arc<TcpListener>,
    state: Arc<State>,
    workers: JoinSet<HandlerResult>,
}

impl DnsServer {
    pub async fn new(bind_addr: SocketAddr, state: State) -> anyhow::Result<Self> {
        let udp_socket = Arc::new(
            UdpSocket::bind(bind_addr)
                .await
                .with_context(|| format!("error while creating a UDP socket on {}", bind_addr))?,
        );
        // Use the same port for TCP when binding to port 0
        let tcp_bind_addr = udp_socket.local_addr().context("UDP socket has no local address")?;
        let tcp_listener = Arc::new(
            TcpListener::bind(tcp_bind_addr)
                .await
                .with_context(|| format!("error while creating a TcpListener on {}", tcp_bind_addr))?,
        );

        Ok(DnsServer {
            udp_socket,
            tcp_listener,
            state: Arc::new(state),
            workers: JoinSet::new(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.udp_socket.local_addr().context("UDP socket has no local address")
    }

    pub fn add_workers(&mut self, n: u8) {
        for idx in 0..n {
            let udp_socket = self.udp_socket.clone();
            let tcp_listener = self.tcp_listener.clone();
            let state = self.state.clone();

            self.workers.spawn(
                handle_incoming_requests(udp_socket, tcp_listener, state)
                    .instrument(tracing::trace_span!("", worker = idx)),
            );
        }
    }

    pub async fn block_until_completion(mut self) -> anyhow::Result<()> {
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result.context("worker task failed to execute")? {
                tracing::error!("Error in a worker: {:#}", e);
            }
        }

        Ok(())
    }
}

async fn handle_incoming_requests(
    udp_socket: Arc<UdpSocket>,
    tcp_listener: Arc<TcpListener>,
    state: Arc<State>,
) -> HandlerResult {
    let mut recv = vec![0; MAX_UDP_PACKET_SIZE];
    let mut handlers: JoinSet<HandlerResult> = JoinSet::new();
    loop {
        let (connection, query) = tokio::select! {
            Ok((len, from)) = udp_socket.recv_from(&mut recv) => {
                tracing::trace!("new UDP connection");

                (Connection::Udp((udp_socket.clone(), Some(from))), recv[..len].to_vec())
            }
            Ok((conn, _)) = tcp_listener.accept() => {
                tracing::trace!("new TCP connection");

                handlers.spawn(handle_tcp_connection(conn, state.clone()).in_current_span());
                continue;
            }
            Some(result) = handlers.join_next() => {
                if let Err(e) = result.context("connection handling task failed to execute")? {
                    tracing::debug!("Error while handling a query: {:#}", e);
                }
                continue;
            }
        };

        handlers.spawn(resolve_query(connection, query, state.clone()).in_current_span());
    }
}

/// Reads a single query from a TCP client and resolves it.
async fn handle_tcp_connection(stream: TcpStream, state: Arc<State>) -> HandlerResult {
    let mut connection = Connection::Tcp(stream);
    let mut query = Vec::new();
    tokio::time::timeout(TCP_READ_TIMEOUT, connection.read(&mut query))
        .await
        .with_context(|| format!("TCP: no query received within {:?}", TCP_READ_TIMEOUT))?
        .context("TCP: failed to read a query")?;

    resolve_query(connection, query, state).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use homeblocker_lib::{DnsQuery, ResponseCode};
    use homeblocker_rules::{BlockConfig, BlockRegistry};
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

    /// `A` query for `blocked.test` with ID 0x0101
    const BLOCKED_QUERY: &[u8] = &[
        0x01, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x07, b'b', b'l', b'o', b'c', b'k', b'e', b'd', 0x04, b't', b'e', b's', b't', 0x00, 0x00, 0x01, 0x00, 0x01,
    ];
    /// `A` query for `allowed.test` with ID 0x0202
    const ALLOWED_QUERY: &[u8] = &[
        0x02, 0x02, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        0x07, b'a', b'l', b'l', b'o', b'w', b'e', b'd', 0x04, b't', b'e', b's', b't', 0x00, 0x00, 0x01, 0x00, 0x01,
    ];

    /// Replies to every query with the same bytes, except for the QR bit and a marker in ANCOUNT.
    async fn spawn_fake_upstream() -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0; 512];
            loop {
                let (len, from) = socket.recv_from(&mut buf).await.unwrap();
                let mut reply = buf[..len].to_vec();
                reply[2] |= 0x80;
                reply[7] = 0x2a;
                socket.send_to(&reply, from).await.unwrap();
            }
        });
        addr
    }

    async fn spawn_server(upstream_resolver: SocketAddr) -> SocketAddr {
        let registry = BlockRegistry::from_config([(
            "always",
            BlockConfig {
                domains: vec!["blocked.test".into()],
                ..Default::default()
            },
        )])
        .unwrap();
        let state = State::new(upstream_resolver, registry);
        let mut server = DnsServer::new("127.0.0.1:0".parse().unwrap(), state).await.unwrap();
        let addr = server.local_addr().unwrap();
        server.add_workers(2);
        tokio::spawn(server.block_until_completion());
        addr
    }

    async fn udp_exchange(server: SocketAddr, query: &[u8]) -> Vec<u8> {
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.connect(server).await.unwrap();
        client.send(query).await.unwrap();
        let mut buf = vec![0; 512];
        let len = client.recv(&mut buf).await.unwrap();
        buf.truncate(len);
        buf
    }

    #[tokio::test]
    async fn blocked_query_gets_an_empty_authoritative_reply() {
        let server = spawn_server(spawn_fake_upstream().await).await;

        let reply = udp_exchange(server, BLOCKED_QUERY).await;
        let reply = DnsQuery::from_bytes(&reply).expect("reply should be decodable");
        assert_eq!(reply.header.id, 0x0101);
        assert!(reply.header.is_response);
        assert!(reply.header.is_authoritative);
        assert_eq!(reply.header.response_code, ResponseCode::Success);
        assert_eq!(reply.header.answer_rr_count, 0);
        assert_eq!(reply.questions[0].qname, "blocked.test");
    }

    #[tokio::test]
    async fn allowed_query_is_relayed_from_upstream() {
        let server = spawn_server(spawn_fake_upstream().await).await;

        let reply = udp_exchange(server, ALLOWED_QUERY).await;
        let mut expected = ALLOWED_QUERY.to_vec();
        expected[2] |= 0x80;
        expected[7] = 0x2a;
        assert_eq!(reply, expected);
    }

    #[tokio::test]
    async fn non_utf8_query_is_relayed_from_upstream() {
        let server = spawn_server(spawn_fake_upstream().await).await;
        let mut query = ALLOWED_QUERY.to_vec();
        query[13] = 0xff;

        let reply = udp_exchange(server, &query).await;
        query[2] |= 0x80;
        query[7] = 0x2a;
        assert_eq!(reply, query);
    }

    #[tokio::test]
    async fn blocked_query_over_tcp() {
        let server = spawn_server(spawn_fake_upstream().await).await;

        let mut stream = TcpStream::connect(server).await.unwrap();
        stream.write_u16(BLOCKED_QUERY.len() as u16).await.unwrap();
        stream.write_all(BLOCKED_QUERY).await.unwrap();
        let len = stream.read_u16().await.unwrap() as usize;
        let mut reply = vec![0; len];
        stream.read_exact(&mut reply).await.unwrap();

        let reply = DnsQuery::from_bytes(&reply).unwrap();
        assert_eq!(reply.header.id, 0x0101);
        assert!(reply.header.is_authoritative);
    }

    #[tokio::test]
    async fn unreachable_upstream_yields_servfail() {
        // Reserve a port and free it so that nothing listens there
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();
        drop(upstream);
        let server = spawn_server(upstream_addr).await;

        let reply = udp_exchange(server, ALLOWED_QUERY).await;
        let reply = DnsQuery::from_bytes(&reply).unwrap();
        assert_eq!(reply.header.id, 0x0202);
        assert_eq!(reply.header.response_code, ResponseCode::ServerFailure);
    }

    #[tokio::test]
    async fn idle_tcp_clients_dont_stall_udp() {
        let server = spawn_server(spawn_fake_upstream().await).await;
        // As many silent clients as there are workers
        let _idle = [
            TcpStream::connect(server).await.unwrap(),
            TcpStream::connect(server).await.unwrap(),
        ];

        let reply = tokio::time::timeout(Duration::from_secs(3), udp_exchange(server, &BLOCKED_QUERY[..16]))
            .await
            .expect("UDP query should be answered while TCP clients are idle");
        let reply = DnsQuery::from_bytes(&reply).unwrap();
        assert_eq!(reply.header.response_code, ResponseCode::FormatError);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_tcp_client_is_disconnected() {
        let server = spawn_server(spawn_fake_upstream().await).await;

        let mut stream = TcpStream::connect(server).await.unwrap();
        let mut buf = [0; 2];
        let read = stream.read(&mut buf).await.unwrap();
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn truncated_query_gets_format_error() {
        let server = spawn_server(spawn_fake_upstream().await).await;

        let reply = udp_exchange(server, &BLOCKED_QUERY[..16]).await;
        let reply = DnsQuery::from_bytes(&reply).unwrap();
        assert_eq!(reply.header.id, 0x0101);
        assert_eq!(reply.header.response_code, ResponseCode::FormatError);
    }
}
