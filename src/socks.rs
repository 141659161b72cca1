/// SOCKS5 protocol engine (RFC 1928 + RFC 1929).
///
/// Both the inbound request parser and the upstream client negotiation
/// are single-byte-driven state machines over buffered readers, so a
/// session never reads past the end of a handshake.
use crate::pool::ProxyDescriptor;
use std::fmt::Write as _;
use std::io;
use std::net::IpAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const VERSION: u8 = 0x05;

pub const METHOD_NO_AUTH: u8 = 0x00;
pub const METHOD_USER_PASS: u8 = 0x02;

pub const CMD_CONNECT: u8 = 0x01;

pub const ATYP_IPV4: u8 = 0x01;
pub const ATYP_DOMAIN: u8 = 0x03;
pub const ATYP_IPV6: u8 = 0x04;

pub const REP_SUCCESS: u8 = 0x00;
pub const REP_GENERAL_FAILURE: u8 = 0x01;

// RFC 1929 sub-negotiation.
pub const AUTH_VERSION: u8 = 0x01;
pub const AUTH_SUCCESS: u8 = 0x00;

#[derive(Debug, thiserror::Error)]
pub enum SocksError {
    #[error("invalid data({state}) from: {peer}")]
    Protocol { state: u8, peer: String },

    #[error("authentication method not supported: {0}")]
    MethodMismatch(String),

    #[error("authentication failed: {host} ({code})")]
    AuthFailed { host: String, code: u8 },

    #[error("command failed: {0}")]
    CommandFailed(u8),

    #[error("provided username or password is too long: {0}")]
    CredentialsTooLong(String),

    #[error("TLS handshake failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn protocol(state: u8, peer: &str) -> SocksError {
    SocksError::Protocol {
        state,
        peer: peer.to_string(),
    }
}

/// A parsed inbound CONNECT request.
///
/// `addr_bytes` is the raw request tail `[RSV, ATYP, <address>]` — for
/// domain ATYP the address includes its length byte. The port bytes are
/// not included; they are re-appended when the request is forwarded.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ClientRequest {
    pub host: String,
    pub port: u16,
    pub addr_bytes: Vec<u8>,
}

/// Consume the client greeting and CONNECT request.
///
/// Writes the `05 00` no-authentication method reply once the greeting
/// completes. Terminal on any protocol violation; the caller abandons
/// the session without a SOCKS5 error reply in that case.
pub async fn read_request<R, W>(
    reader: &mut R,
    writer: &mut W,
    peer: &str,
) -> Result<ClientRequest, SocksError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut request = ClientRequest::default();
    let mut state: u8 = 0;
    let mut store: usize = 0;

    while state < 13 {
        let data = reader.read_u8().await?;
        match state {
            // Version 5
            0 => {
                if data != VERSION {
                    return Err(protocol(0, peer));
                }
                state = 1;
            }
            // Number of offered authentication methods
            1 => {
                if data == 0 {
                    return Err(protocol(1, peer));
                }
                store = data as usize;
                state = 2;
            }
            // Method bytes (ignored); reply once the last one is in
            2 => {
                store -= 1;
                if store == 0 {
                    writer.write_all(&[VERSION, METHOD_NO_AUTH]).await?;
                    writer.flush().await?;
                    state = 4;
                }
            }
            // Version 5 again, heading the request
            4 => {
                if data != VERSION {
                    return Err(protocol(4, peer));
                }
                state = 5;
            }
            // Only CONNECT is served
            5 => {
                if data != CMD_CONNECT {
                    return Err(protocol(5, peer));
                }
                state = 6;
            }
            // Reserved byte, captured verbatim
            6 => {
                request.addr_bytes.push(data);
                state = 7;
            }
            // Address type
            7 => {
                request.addr_bytes.push(data);
                match data {
                    ATYP_IPV4 => {
                        store = 4;
                        state = 8;
                    }
                    ATYP_DOMAIN => {
                        state = 9;
                    }
                    ATYP_IPV6 => {
                        store = 16;
                        state = 11;
                    }
                    _ => return Err(protocol(7, peer)),
                }
            }
            // IPv4 octets, rendered dotted-decimal
            8 => {
                request.addr_bytes.push(data);
                store -= 1;
                let _ = write!(request.host, "{data}");
                if store == 0 {
                    store = 2;
                    state = 12;
                } else {
                    request.host.push('.');
                }
            }
            // Domain length; zero-length proceeds straight to the port
            9 => {
                request.addr_bytes.push(data);
                if data == 0 {
                    store = 2;
                    state = 12;
                } else {
                    store = data as usize;
                    state = 10;
                }
            }
            // Domain bytes
            10 => {
                request.addr_bytes.push(data);
                store -= 1;
                request.host.push(data as char);
                if store == 0 {
                    store = 2;
                    state = 12;
                }
            }
            // IPv6 bytes, rendered as hex pairs joined with ':'
            11 => {
                request.addr_bytes.push(data);
                store -= 1;
                let _ = write!(request.host, "{data:02x}");
                if store > 0 && store % 2 == 0 {
                    request.host.push(':');
                }
                if store == 0 {
                    store = 2;
                    state = 12;
                }
            }
            // Port, big-endian
            12 => {
                request.port = (request.port << 8) | u16::from(data);
                store -= 1;
                if store == 0 {
                    state = 13;
                }
            }
            _ => unreachable!("parser state {state}"),
        }
    }
    Ok(request)
}

/// Reject descriptors whose credentials cannot fit the one-byte length
/// fields of the RFC 1929 sub-negotiation. Checked before dialing.
pub fn check_credentials(proxy: &ProxyDescriptor) -> Result<(), SocksError> {
    if proxy.username.len() > 255 || proxy.password.len() > 255 {
        return Err(SocksError::CredentialsTooLong(proxy.host.clone()));
    }
    Ok(())
}

/// Drive the SOCKS5 client handshake against an upstream proxy.
///
/// Sends the greeting, runs the optional username/password
/// sub-negotiation, forwards the client's CONNECT request, and returns
/// the upstream reply tail `[RSV, ATYP, <address>, <port>]` for
/// verbatim forwarding to the client.
pub async fn negotiate_upstream<R, W>(
    reader: &mut R,
    writer: &mut W,
    proxy: &ProxyDescriptor,
    request: &ClientRequest,
) -> Result<Vec<u8>, SocksError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let auth_method = if proxy.username.is_empty() && proxy.password.is_empty() {
        METHOD_NO_AUTH
    } else {
        METHOD_USER_PASS
    };
    writer.write_all(&[VERSION, 0x01, auth_method]).await?;
    writer.flush().await?;

    let mut response = Vec::new();
    let mut state: u8 = 0;
    let mut store: usize = 0;

    while state < 15 {
        let data = reader.read_u8().await?;
        match state {
            // Version 5
            0 => {
                if data != VERSION {
                    return Err(protocol(0, &proxy.host));
                }
                state = 1;
            }
            // Selected method; with no-auth the CONNECT goes out now
            1 => {
                if data != auth_method {
                    return Err(SocksError::MethodMismatch(proxy.host.clone()));
                }
                if auth_method == METHOD_USER_PASS {
                    let mut sub =
                        Vec::with_capacity(3 + proxy.username.len() + proxy.password.len());
                    sub.push(AUTH_VERSION);
                    sub.push(proxy.username.len() as u8);
                    sub.extend_from_slice(proxy.username.as_bytes());
                    sub.push(proxy.password.len() as u8);
                    sub.extend_from_slice(proxy.password.as_bytes());
                    writer.write_all(&sub).await?;
                    writer.flush().await?;
                    state = 3;
                } else {
                    send_connect(writer, request).await?;
                    state = 6;
                }
            }
            // Sub-negotiation version
            3 => {
                if data != AUTH_VERSION {
                    return Err(protocol(3, &proxy.host));
                }
                state = 4;
            }
            // Sub-negotiation status; success releases the CONNECT
            4 => {
                if data != AUTH_SUCCESS {
                    return Err(SocksError::AuthFailed {
                        host: proxy.host.clone(),
                        code: data,
                    });
                }
                send_connect(writer, request).await?;
                state = 6;
            }
            // Version 5 heading the reply
            6 => {
                if data != VERSION {
                    return Err(protocol(6, &proxy.host));
                }
                state = 7;
            }
            // Reply code
            7 => {
                if data != REP_SUCCESS {
                    return Err(SocksError::CommandFailed(data));
                }
                state = 8;
            }
            // Reserved byte
            8 => {
                response.push(data);
                state = 9;
            }
            // Bound address type
            9 => {
                response.push(data);
                match data {
                    ATYP_IPV4 => {
                        store = 4;
                        state = 10;
                    }
                    ATYP_DOMAIN => {
                        state = 11;
                    }
                    ATYP_IPV6 => {
                        store = 16;
                        state = 13;
                    }
                    _ => return Err(protocol(9, &proxy.host)),
                }
            }
            // Fixed-length bound address (IPv4 or IPv6)
            10 | 13 => {
                response.push(data);
                store -= 1;
                if store == 0 {
                    store = 2;
                    state = 14;
                }
            }
            // Bound domain length
            11 => {
                response.push(data);
                if data == 0 {
                    store = 2;
                    state = 14;
                } else {
                    store = data as usize;
                    state = 12;
                }
            }
            // Bound domain bytes
            12 => {
                response.push(data);
                store -= 1;
                if store == 0 {
                    store = 2;
                    state = 14;
                }
            }
            // Bound port
            14 => {
                response.push(data);
                store -= 1;
                if store == 0 {
                    state = 15;
                }
            }
            _ => unreachable!("negotiation state {state}"),
        }
    }
    Ok(response)
}

/// Forward the captured request to the upstream: `05 01` + addrBytes +
/// port, big-endian.
async fn send_connect<W>(writer: &mut W, request: &ClientRequest) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[VERSION, CMD_CONNECT]).await?;
    writer.write_all(&request.addr_bytes).await?;
    writer.write_all(&request.port.to_be_bytes()).await?;
    writer.flush().await
}

/// The one general-failure reply every outbound failure path shares:
/// `05 01` + addrBytes + an undefined port.
pub async fn write_failure<W>(writer: &mut W, addr_bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[VERSION, REP_GENERAL_FAILURE]).await?;
    writer.write_all(addr_bytes).await?;
    writer.write_all(&[0x00, 0x00]).await?;
    writer.flush().await
}

/// Direct-mode success reply: the advertised address and the local port
/// of the freshly dialed outbound socket.
pub async fn write_direct_success<W>(
    writer: &mut W,
    report_ip: IpAddr,
    local_port: u16,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[VERSION, REP_SUCCESS, 0x00]).await?;
    match report_ip {
        IpAddr::V4(ip) => {
            writer.write_all(&[ATYP_IPV4]).await?;
            writer.write_all(&ip.octets()).await?;
        }
        IpAddr::V6(ip) => {
            writer.write_all(&[ATYP_IPV6]).await?;
            writer.write_all(&ip.octets()).await?;
        }
    }
    writer.write_all(&local_port.to_be_bytes()).await?;
    writer.flush().await
}

/// Relayed-mode success reply: `05 00` followed by the upstream reply
/// tail exactly as received.
pub async fn write_relayed_success<W>(writer: &mut W, response: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&[VERSION, REP_SUCCESS]).await?;
    writer.write_all(response).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    async fn parse(input: &[u8]) -> (Result<ClientRequest, SocksError>, Vec<u8>) {
        let (mut near, far) = duplex(1024);
        near.write_all(input).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(far);
        let result = read_request(&mut reader, &mut writer, "test-client").await;
        drop(reader);
        drop(writer);
        let mut replied = vec![0u8; 2];
        let reply = match near.read_exact(&mut replied).await {
            Ok(_) => replied,
            Err(_) => Vec::new(),
        };
        (result, reply)
    }

    #[tokio::test]
    async fn parses_domain_connect() {
        let mut input = vec![0x05, 0x01, 0x00];
        input.extend_from_slice(&[0x05, 0x01, 0x00, 0x03, 0x07]);
        input.extend_from_slice(b"example");
        input.extend_from_slice(&[0x01, 0xbb]);

        let (result, reply) = parse(&input).await;
        let request = result.unwrap();
        assert_eq!(reply, vec![0x05, 0x00]);
        assert_eq!(request.host, "example");
        assert_eq!(request.port, 443);
        let mut expected = vec![0x00, 0x03, 0x07];
        expected.extend_from_slice(b"example");
        assert_eq!(request.addr_bytes, expected);
    }

    #[tokio::test]
    async fn parses_ipv4_connect() {
        let input = [
            0x05, 0x01, 0x00, 0x05, 0x01, 0x00, 0x01, 198, 51, 100, 9, 0x01, 0xbb,
        ];
        let (result, _) = parse(&input).await;
        let request = result.unwrap();
        assert_eq!(request.host, "198.51.100.9");
        assert_eq!(request.port, 443);
        assert_eq!(request.addr_bytes, vec![0x00, 0x01, 198, 51, 100, 9]);
    }

    #[tokio::test]
    async fn parses_ipv6_connect() {
        let mut input = vec![0x05, 0x01, 0x00, 0x05, 0x01, 0x00, 0x04];
        let addr = [
            0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x01,
        ];
        input.extend_from_slice(&addr);
        input.extend_from_slice(&[0x1f, 0x90]);

        let (result, _) = parse(&input).await;
        let request = result.unwrap();
        assert_eq!(request.host, "2001:0db8:0000:0000:0000:0000:0000:0001");
        assert_eq!(request.port, 8080);
        let mut expected = vec![0x00, 0x04];
        expected.extend_from_slice(&addr);
        assert_eq!(request.addr_bytes, expected);
    }

    #[tokio::test]
    async fn accepts_multiple_offered_methods() {
        let input = [
            0x05, 0x02, 0x00, 0x02, 0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x00, 0x50,
        ];
        let (result, reply) = parse(&input).await;
        assert_eq!(reply, vec![0x05, 0x00]);
        assert_eq!(result.unwrap().port, 80);
    }

    #[tokio::test]
    async fn rejects_wrong_version() {
        let (result, _) = parse(&[0x04, 0x01, 0x00]).await;
        assert!(matches!(result, Err(SocksError::Protocol { state: 0, .. })));
    }

    #[tokio::test]
    async fn rejects_zero_method_count() {
        let (result, _) = parse(&[0x05, 0x00]).await;
        assert!(matches!(result, Err(SocksError::Protocol { state: 1, .. })));
    }

    #[tokio::test]
    async fn rejects_bind_command() {
        let (result, reply) = parse(&[0x05, 0x01, 0x00, 0x05, 0x02, 0x00]).await;
        assert_eq!(reply, vec![0x05, 0x00]);
        assert!(matches!(result, Err(SocksError::Protocol { state: 5, .. })));
    }

    #[tokio::test]
    async fn rejects_unknown_address_type() {
        let (result, _) = parse(&[0x05, 0x01, 0x00, 0x05, 0x01, 0x00, 0x05]).await;
        assert!(matches!(result, Err(SocksError::Protocol { state: 7, .. })));
    }

    #[tokio::test]
    async fn zero_length_domain_yields_empty_host() {
        let input = [0x05, 0x01, 0x00, 0x05, 0x01, 0x00, 0x03, 0x00, 0x01, 0xbb];
        let (result, _) = parse(&input).await;
        let request = result.unwrap();
        assert_eq!(request.host, "");
        assert_eq!(request.port, 443);
        assert_eq!(request.addr_bytes, vec![0x00, 0x03, 0x00]);
    }

    #[tokio::test]
    async fn request_reconstructs_byte_for_byte() {
        let mut connect = vec![0x05, 0x01, 0x00, 0x03, 0x0b];
        connect.extend_from_slice(b"badhost.com");
        connect.extend_from_slice(&[0x01, 0xbb]);

        let mut input = vec![0x05, 0x01, 0x00];
        input.extend_from_slice(&connect);
        let (result, _) = parse(&input).await;
        let request = result.unwrap();

        let mut rebuilt = vec![VERSION, CMD_CONNECT];
        rebuilt.extend_from_slice(&request.addr_bytes);
        rebuilt.extend_from_slice(&request.port.to_be_bytes());
        assert_eq!(rebuilt, connect);
    }

    fn proxy(username: &str, password: &str) -> ProxyDescriptor {
        ProxyDescriptor {
            host: "u.example".to_string(),
            port: 1080,
            use_tls: false,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn ipv4_request() -> ClientRequest {
        ClientRequest {
            host: "198.51.100.9".to_string(),
            port: 443,
            addr_bytes: vec![0x00, 0x01, 198, 51, 100, 9],
        }
    }

    #[tokio::test]
    async fn negotiates_with_userpass() {
        let (upstream, mine) = duplex(1024);
        let server = tokio::spawn(async move {
            let mut upstream = upstream;
            let mut greeting = [0u8; 3];
            upstream.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [0x05, 0x01, 0x02]);
            upstream.write_all(&[0x05, 0x02]).await.unwrap();

            let mut sub = [0u8; 5];
            upstream.read_exact(&mut sub).await.unwrap();
            assert_eq!(sub, [0x01, 0x01, b'a', 0x01, b'b']);
            upstream.write_all(&[0x01, 0x00]).await.unwrap();

            let mut connect = [0u8; 10];
            upstream.read_exact(&mut connect).await.unwrap();
            assert_eq!(connect, [0x05, 0x01, 0x00, 0x01, 198, 51, 100, 9, 0x01, 0xbb]);
            upstream
                .write_all(&[0x05, 0x00, 0x00, 0x01, 0xc6, 0x33, 0x64, 0x09, 0x01, 0xbb])
                .await
                .unwrap();
        });

        let (mut reader, mut writer) = tokio::io::split(mine);
        let response =
            negotiate_upstream(&mut reader, &mut writer, &proxy("a", "b"), &ipv4_request())
                .await
                .unwrap();
        assert_eq!(response, vec![0x00, 0x01, 0xc6, 0x33, 0x64, 0x09, 0x01, 0xbb]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn skips_sub_negotiation_without_credentials() {
        let (upstream, mine) = duplex(1024);
        let server = tokio::spawn(async move {
            let mut upstream = upstream;
            let mut greeting = [0u8; 3];
            upstream.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [0x05, 0x01, 0x00]);
            upstream.write_all(&[0x05, 0x00]).await.unwrap();

            // The CONNECT must come next, with no RFC 1929 bytes in between.
            let mut connect = [0u8; 10];
            upstream.read_exact(&mut connect).await.unwrap();
            assert_eq!(connect, [0x05, 0x01, 0x00, 0x01, 198, 51, 100, 9, 0x01, 0xbb]);
            upstream
                .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0x00, 0x00])
                .await
                .unwrap();
        });

        let (mut reader, mut writer) = tokio::io::split(mine);
        let response =
            negotiate_upstream(&mut reader, &mut writer, &proxy("", ""), &ipv4_request())
                .await
                .unwrap();
        assert_eq!(response, vec![0x00, 0x01, 0, 0, 0, 0, 0x00, 0x00]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn reports_auth_failure() {
        let (upstream, mine) = duplex(1024);
        tokio::spawn(async move {
            let mut upstream = upstream;
            let mut greeting = [0u8; 3];
            upstream.read_exact(&mut greeting).await.unwrap();
            upstream.write_all(&[0x05, 0x02]).await.unwrap();
            let mut sub = [0u8; 5];
            upstream.read_exact(&mut sub).await.unwrap();
            upstream.write_all(&[0x01, 0x01]).await.unwrap();
        });

        let (mut reader, mut writer) = tokio::io::split(mine);
        let err = negotiate_upstream(&mut reader, &mut writer, &proxy("a", "b"), &ipv4_request())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::AuthFailed { code: 1, .. }));
        assert!(err.to_string().contains("authentication failed"));
    }

    #[tokio::test]
    async fn reports_method_mismatch() {
        let (upstream, mine) = duplex(1024);
        tokio::spawn(async move {
            let mut upstream = upstream;
            let mut greeting = [0u8; 3];
            upstream.read_exact(&mut greeting).await.unwrap();
            upstream.write_all(&[0x05, 0xff]).await.unwrap();
        });

        let (mut reader, mut writer) = tokio::io::split(mine);
        let err = negotiate_upstream(&mut reader, &mut writer, &proxy("a", "b"), &ipv4_request())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::MethodMismatch(_)));
    }

    #[tokio::test]
    async fn reports_command_failure() {
        let (upstream, mine) = duplex(1024);
        tokio::spawn(async move {
            let mut upstream = upstream;
            let mut greeting = [0u8; 3];
            upstream.read_exact(&mut greeting).await.unwrap();
            upstream.write_all(&[0x05, 0x00]).await.unwrap();
            let mut connect = [0u8; 10];
            upstream.read_exact(&mut connect).await.unwrap();
            upstream.write_all(&[0x05, 0x05]).await.unwrap();
        });

        let (mut reader, mut writer) = tokio::io::split(mine);
        let err = negotiate_upstream(&mut reader, &mut writer, &proxy("", ""), &ipv4_request())
            .await
            .unwrap_err();
        assert!(matches!(err, SocksError::CommandFailed(0x05)));
    }

    #[tokio::test]
    async fn reads_domain_bound_address_in_reply() {
        let (upstream, mine) = duplex(1024);
        tokio::spawn(async move {
            let mut upstream = upstream;
            let mut greeting = [0u8; 3];
            upstream.read_exact(&mut greeting).await.unwrap();
            upstream.write_all(&[0x05, 0x00]).await.unwrap();
            let mut connect = [0u8; 10];
            upstream.read_exact(&mut connect).await.unwrap();
            let mut reply = vec![0x05, 0x00, 0x00, 0x03, 0x04];
            reply.extend_from_slice(b"exit");
            reply.extend_from_slice(&[0x04, 0x38]);
            upstream.write_all(&reply).await.unwrap();
        });

        let (mut reader, mut writer) = tokio::io::split(mine);
        let response =
            negotiate_upstream(&mut reader, &mut writer, &proxy("", ""), &ipv4_request())
                .await
                .unwrap();
        let mut expected = vec![0x00, 0x03, 0x04];
        expected.extend_from_slice(b"exit");
        expected.extend_from_slice(&[0x04, 0x38]);
        assert_eq!(response, expected);
    }

    #[test]
    fn credential_length_boundary() {
        assert!(check_credentials(&proxy(&"u".repeat(255), &"p".repeat(255))).is_ok());
        let err = check_credentials(&proxy(&"u".repeat(256), "p")).unwrap_err();
        assert!(matches!(err, SocksError::CredentialsTooLong(_)));
        assert!(check_credentials(&proxy("u", &"p".repeat(256))).is_err());
    }

    #[tokio::test]
    async fn failure_reply_bytes() {
        let mut out = Vec::new();
        let addr_bytes = [0x00, 0x03, 0x02, b'h', b'i'];
        write_failure(&mut out, &addr_bytes).await.unwrap();
        let mut expected = vec![0x05, 0x01];
        expected.extend_from_slice(&addr_bytes);
        expected.extend_from_slice(&[0x00, 0x00]);
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn direct_success_reply_bytes_v4() {
        let mut out = Vec::new();
        write_direct_success(&mut out, "203.0.113.7".parse().unwrap(), 40000)
            .await
            .unwrap();
        assert_eq!(
            out,
            vec![0x05, 0x00, 0x00, 0x01, 0xcb, 0x00, 0x71, 0x07, 0x9c, 0x40]
        );
    }

    #[tokio::test]
    async fn direct_success_reply_bytes_v6() {
        let mut out = Vec::new();
        write_direct_success(&mut out, "2001:db8::1".parse().unwrap(), 443)
            .await
            .unwrap();
        let mut expected = vec![0x05, 0x00, 0x00, 0x04];
        expected.extend_from_slice(&[0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        expected.extend_from_slice(&[0x01, 0xbb]);
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn relayed_success_reply_bytes() {
        let mut out = Vec::new();
        let response = [0x00, 0x01, 0xc6, 0x33, 0x64, 0x09, 0x01, 0xbb];
        write_relayed_success(&mut out, &response).await.unwrap();
        let mut expected = vec![0x05, 0x00];
        expected.extend_from_slice(&response);
        assert_eq!(out, expected);
    }
}
