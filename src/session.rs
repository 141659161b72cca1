use crate::connection::{splice, BoxedTransport, Connection};
use crate::filter::DomainFilter;
use crate::logger::LogSink;
use crate::pool::{ProxyDescriptor, UpstreamPool};
use crate::socks::{self, ClientRequest, SocksError};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::net::TcpStream;

/// State shared by every session: read-mostly after startup.
pub struct SessionContext {
    pub filter: DomainFilter,
    pub pool: UpstreamPool,
    pub report_ip: IpAddr,
    pub log: LogSink,
}

/// One accepted client, from handshake to splice.
pub struct ClientSession {
    ctx: Arc<SessionContext>,
    client: Connection,
}

impl ClientSession {
    pub fn new(ctx: Arc<SessionContext>, transport: BoxedTransport, host: String, port: u16) -> Self {
        let client = Connection::new(host, port, transport);
        Self { ctx, client }
    }

    /// Drive the whole session. The client transport is closed on every
    /// exit path; the remote transport is closed iff it was opened.
    pub async fn run(mut self) {
        let request = match socks::read_request(
            &mut self.client.reader,
            &mut self.client.writer,
            &self.client.host,
        )
        .await
        {
            Ok(request) => request,
            Err(err) => {
                self.ctx
                    .log
                    .line(format!(
                        "Invalid request from: {}:{} ({err})",
                        self.client.host, self.client.port
                    ))
                    .await;
                return;
            }
        };

        // A blacklisted destination gets no SOCKS5 reply at all; the
        // connection is simply dropped.
        if self.ctx.filter.matches(&request.host) {
            self.ctx
                .log
                .line(format!("Blacklisted: {}", request.host))
                .await;
            return;
        }

        let (remote, proxy) = match self.connect_outbound(&request).await {
            Ok(outcome) => outcome,
            Err(_) => return,
        };

        let via = match &proxy {
            Some(proxy) => format!("[{}]{}:{}", proxy.host, remote.host, remote.port),
            None => format!("{}:{}", remote.host, remote.port),
        };
        let client_addr = format!("[{}]:{}", self.client.host, self.client.port);
        self.ctx
            .log
            .line(format!("Opened: {client_addr} -> {via}"))
            .await;

        let (from_client, from_remote) = splice(self.client, remote).await;

        self.ctx
            .log
            .line(format!(
                "Closed: {client_addr} -> {via} ({from_client}:{from_remote} bytes)"
            ))
            .await;
    }

    /// Establish the remote side: a direct dial when the pool is empty,
    /// otherwise a relay through one randomly selected upstream. Every
    /// failure emits the shared general-failure reply before returning.
    async fn connect_outbound(
        &mut self,
        request: &ClientRequest,
    ) -> Result<(Connection, Option<ProxyDescriptor>), SocksError> {
        let proxy = match self.ctx.pool.select() {
            // Empty pool means direct mode.
            None => {
                let (transport, local_port) = match dial_direct(request).await {
                    Ok(dialed) => dialed,
                    Err(err) => return self.fail(err, request).await,
                };
                let remote = Connection::new(request.host.clone(), request.port, transport);
                socks::write_direct_success(
                    &mut self.client.writer,
                    self.ctx.report_ip,
                    local_port,
                )
                .await?;
                return Ok((remote, None));
            }
            Some(proxy) => proxy,
        };

        if let Err(err) = socks::check_credentials(&proxy) {
            return self.fail(err, request).await;
        }

        let transport = match dial_proxy(&proxy).await {
            Ok(transport) => transport,
            Err(err) => return self.fail(err, request).await,
        };
        let mut remote = Connection::new(request.host.clone(), request.port, transport);

        match socks::negotiate_upstream(&mut remote.reader, &mut remote.writer, &proxy, request)
            .await
        {
            Ok(response) => {
                socks::write_relayed_success(&mut self.client.writer, &response).await?;
                Ok((remote, Some(proxy)))
            }
            // The upstream's own reason code is never forwarded; drop
            // the remote connection and report a general failure.
            Err(err) => self.fail(err, request).await,
        }
    }

    /// Shared failure path: general-failure reply to the client, then
    /// the error both logged and returned.
    async fn fail(
        &mut self,
        err: SocksError,
        request: &ClientRequest,
    ) -> Result<(Connection, Option<ProxyDescriptor>), SocksError> {
        let _ = socks::write_failure(&mut self.client.writer, &request.addr_bytes).await;
        self.ctx.log.line(format!("Error: {err}")).await;
        Err(err)
    }
}

/// Dial the destination itself. Returns the transport and the local
/// port of the outbound socket, which the success reply advertises.
async fn dial_direct(request: &ClientRequest) -> Result<(BoxedTransport, u16), SocksError> {
    let stream = TcpStream::connect((request.host.as_str(), request.port)).await?;
    let _ = stream.set_nodelay(true);
    let local_port = stream.local_addr()?.port();
    Ok((Box::new(stream), local_port))
}

/// Dial an upstream proxy, TLS-wrapping when configured. Certificate
/// verification stays on.
async fn dial_proxy(proxy: &ProxyDescriptor) -> Result<BoxedTransport, SocksError> {
    let stream = TcpStream::connect((proxy.host.as_str(), proxy.port)).await?;
    let _ = stream.set_nodelay(true);
    if !proxy.use_tls {
        return Ok(Box::new(stream));
    }
    let connector = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
    let tls = connector.connect(&proxy.host, stream).await?;
    Ok(Box::new(tls))
}
