//! Line-oriented connection over any async byte stream.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// A line-based view of a peer connection.
///
/// Both protocols exchange CRLF-terminated text lines. Input is decoded as
/// UTF-8 lossily and a bare LF is accepted as a terminator.
pub struct Connection<S> {
    stream: BufReader<S>,
    buf: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wrap a stream.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            buf: Vec::with_capacity(1024),
        }
    }

    /// Read the next line without its terminator.
    ///
    /// Returns `Ok(None)` once the peer has closed the connection. A final
    /// unterminated fragment is returned as a line of its own.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        let n = self.stream.read_until(b'\n', &mut self.buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Write one line followed by CRLF, then flush.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let inner = self.stream.get_mut();
        inner.write_all(line.as_bytes()).await?;
        inner.write_all(b"\r\n").await?;
        inner.flush().await
    }

    /// Write pre-formatted text as-is, then flush.
    pub async fn write_raw(&mut self, data: &str) -> std::io::Result<()> {
        let inner = self.stream.get_mut();
        inner.write_all(data.as_bytes()).await?;
        inner.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_read_line_strips_terminators() {
        let (client, server) = duplex(1024);
        let mut conn = Connection::new(server);
        let mut client = client;

        client.write_all(b"HELO a\r\nQUIT\nlast").await.unwrap();
        drop(client);

        assert_eq!(conn.read_line().await.unwrap().as_deref(), Some("HELO a"));
        assert_eq!(conn.read_line().await.unwrap().as_deref(), Some("QUIT"));
        assert_eq!(conn.read_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(conn.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_line_keeps_inner_whitespace_and_empty_lines() {
        let (mut client, server) = duplex(1024);
        let mut conn = Connection::new(server);

        client.write_all(b"\r\n  indented \r\n").await.unwrap();

        assert_eq!(conn.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(
            conn.read_line().await.unwrap().as_deref(),
            Some("  indented ")
        );
    }

    #[tokio::test]
    async fn test_read_line_is_lossy_on_invalid_utf8() {
        let (mut client, server) = duplex(1024);
        let mut conn = Connection::new(server);

        client.write_all(b"caf\xe9\r\n").await.unwrap();

        assert_eq!(
            conn.read_line().await.unwrap().as_deref(),
            Some("caf\u{FFFD}")
        );
    }

    #[tokio::test]
    async fn test_write_line_appends_crlf() {
        let (mut client, server) = duplex(1024);
        let mut conn = Connection::new(server);

        conn.write_line("250 OK").await.unwrap();
        conn.write_raw("+OK\r\n.\r\n").await.unwrap();
        drop(conn);

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "250 OK\r\n+OK\r\n.\r\n");
    }
}
