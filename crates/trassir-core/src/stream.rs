use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::ApiError;

const MAX_HEADER_LINES: usize = 10;

/// Raw MJPEG playback connection. Opening it makes the server start serving
/// the archive; the payload itself is never read. The socket closes on drop.
pub struct StreamConnection {
    peer: String,
    _reader: BufReader<TcpStream>,
}

impl StreamConnection {
    pub async fn open(
        host: &str,
        port: u16,
        token: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let peer = format!("{host}:{port}");
        let mut stream = timeout(connect_timeout, TcpStream::connect(peer.as_str()))
            .await
            .map_err(|_| ApiError::Timeout(format!("connecting to {peer}")))??;

        let request =
            format!("GET /{token} HTTP/1.1\r\nHost: {host}\r\nConnection: keep-alive\r\n\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut reader = BufReader::new(stream);
        match timeout(read_timeout, read_header(&mut reader)).await {
            Ok(Ok(header)) => debug!(%peer, %header, "stream header"),
            Ok(Err(err)) => debug!(%peer, error = %err, "stream header unreadable"),
            Err(_) => debug!(%peer, "stream header timed out"),
        }

        Ok(Self {
            peer,
            _reader: reader,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        debug!(peer = %self.peer, "stream connection closed");
    }
}

async fn read_header(reader: &mut BufReader<TcpStream>) -> std::io::Result<String> {
    let mut header = String::new();
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 || line.trim().is_empty() {
            break;
        }
        header.push_str(&line);
    }
    Ok(header)
}
