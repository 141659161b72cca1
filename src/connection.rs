use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf,
};

/// Object-safe transport bound: a TCP stream or a TLS-wrapped stream.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Transport for T {}

pub type BoxedTransport = Box<dyn Transport>;

const COPY_BUFFER_SIZE: usize = 16 * 1024;

/// One side of a session: an established transport split into a
/// buffered reader/writer pair.
///
/// Buffering on the read side matters: the handshake parsers consume
/// one byte at a time.
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub reader: BufReader<ReadHalf<BoxedTransport>>,
    pub writer: BufWriter<WriteHalf<BoxedTransport>>,
}

impl Connection {
    pub fn new(host: String, port: u16, transport: BoxedTransport) -> Self {
        let (read_half, write_half) = tokio::io::split(transport);
        Self {
            host,
            port,
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }
}

/// Run the two unidirectional copies of an established tunnel until
/// both sides have finished, then drop (close) both transports.
///
/// Returns `(bytes read from client, bytes read from remote)`. The two
/// directions are independent streams: when one ends, the other keeps
/// running until its own EOF or error.
pub async fn splice(client: Connection, remote: Connection) -> (u64, u64) {
    let Connection {
        reader: client_reader,
        writer: client_writer,
        ..
    } = client;
    let Connection {
        reader: remote_reader,
        writer: remote_writer,
        ..
    } = remote;

    tokio::join!(
        copy_one_way(client_reader, remote_writer),
        copy_one_way(remote_reader, client_writer),
    )
}

/// Copy until EOF or error (errors are treated as end-of-stream), then
/// half-close the destination. Returns the number of bytes moved.
async fn copy_one_way<R, W>(mut reader: R, mut writer: W) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        if writer.write_all(&buffer[..n]).await.is_err() {
            break;
        }
        if writer.flush().await.is_err() {
            break;
        }
        copied += n as u64;
    }
    let _ = writer.shutdown().await;
    copied
}
