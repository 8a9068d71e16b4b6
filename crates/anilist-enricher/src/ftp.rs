//! Minimal passive-mode FTP client built directly on TCP sockets.
//!
//! Implements only the subset the image mirror needs: USER/PASS login,
//! PASV data-channel negotiation, STOR upload and QUIT. Every command is
//! followed by reading exactly one newline-terminated reply line, which is
//! logged but not inspected for a success code, so a failed STOR is not
//! detected as an error. IPv4 only.

use anyhow::{bail, Context, Result};
use std::path::Path;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

/// Malformed PASV reply
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PasvError {
    #[error("PASV reply has no parenthesized address tuple")]
    MissingTuple,
    #[error("PASV reply has {0} address fields, expected 6")]
    FieldCount(usize),
    #[error("PASV reply has a non-numeric address field: {0:?}")]
    BadNumber(String),
}

/// Parse the `(h1,h2,h3,h4,p1,p2)` tuple out of a PASV reply into an IPv4
/// address and a data port (`p1 * 256 + p2`).
pub fn parse_pasv_reply(reply: &str) -> Result<(String, u16), PasvError> {
    let start = reply.find('(').ok_or(PasvError::MissingTuple)?;
    let end = reply.find(')').ok_or(PasvError::MissingTuple)?;
    if end <= start {
        return Err(PasvError::MissingTuple);
    }

    let fields: Vec<&str> = reply[start + 1..end].split(',').collect();
    if fields.len() != 6 {
        return Err(PasvError::FieldCount(fields.len()));
    }

    let mut numbers = [0u16; 6];
    for (slot, field) in numbers.iter_mut().zip(&fields) {
        *slot = field
            .parse::<u8>()
            .map(u16::from)
            .map_err(|_| PasvError::BadNumber((*field).to_string()))?;
    }

    let host = format!(
        "{}.{}.{}.{}",
        numbers[0], numbers[1], numbers[2], numbers[3]
    );
    let port = numbers[4] * 256 + numbers[5];

    Ok((host, port))
}

/// An authenticated FTP control session
pub struct FtpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl FtpClient {
    /// Connect to the control channel and log in.
    ///
    /// Login is folded into construction; there is no separate
    /// unauthenticated state.
    pub async fn connect(addr: &str, user: &str, password: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to FTP server at {}", addr))?;

        let (read_half, write_half) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        };

        // Server greeting
        client.read_reply().await?;

        client.command(&format!("USER {}", user)).await?;
        client.command(&format!("PASS {}", password)).await?;

        debug!(addr = addr, "FTP session established");

        Ok(client)
    }

    /// Send one control command and read its single reply line
    async fn command(&mut self, line: &str) -> Result<String> {
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to send FTP command")?;
        self.writer
            .write_all(b"\r\n")
            .await
            .context("Failed to send FTP command")?;

        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .context("Failed to read FTP reply")?;
        if read == 0 {
            bail!("FTP server closed the control connection");
        }

        let reply = line.trim().to_string();
        debug!(reply = %reply, "FTP server");

        Ok(reply)
    }

    /// Upload one file over a freshly negotiated passive data connection.
    ///
    /// The file is stored remotely under its local file name.
    pub async fn upload_file(&mut self, path: &Path) -> Result<()> {
        let reply = self.command("PASV").await?;
        let (host, port) = parse_pasv_reply(&reply)
            .with_context(|| format!("Malformed PASV reply: {}", reply))?;

        let mut data = TcpStream::connect((host.as_str(), port))
            .await
            .with_context(|| format!("Failed to open data connection to {}:{}", host, port))?;

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("Upload path has no file name")?;
        self.command(&format!("STOR {}", filename)).await?;

        let mut file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        tokio::io::copy(&mut file, &mut data)
            .await
            .context("Failed to stream file over data connection")?;

        // Closing the data channel marks the end of the transfer
        data.shutdown().await.ok();
        drop(data);

        // Transfer-complete reply
        self.read_reply().await?;

        debug!(file = filename, "File sent over FTP");

        Ok(())
    }

    /// Send QUIT and drop the socket
    pub async fn close(mut self) -> Result<()> {
        self.command("QUIT").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_pasv_reply() {
        let (host, port) =
            parse_pasv_reply("227 Entering Passive Mode (127,0,0,1,19,136).").unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 19 * 256 + 136);
        assert_eq!(port, 5000);
    }

    #[test]
    fn test_parse_pasv_reply_without_tuple() {
        assert_eq!(
            parse_pasv_reply("227 Entering Passive Mode"),
            Err(PasvError::MissingTuple)
        );
        assert_eq!(parse_pasv_reply("227 )("), Err(PasvError::MissingTuple));
    }

    #[test]
    fn test_parse_pasv_reply_wrong_field_count() {
        assert_eq!(
            parse_pasv_reply("227 (127,0,0,1,19)"),
            Err(PasvError::FieldCount(5))
        );
    }

    #[test]
    fn test_parse_pasv_reply_non_numeric() {
        assert_eq!(
            parse_pasv_reply("227 (127,0,0,one,19,136)"),
            Err(PasvError::BadNumber("one".to_string()))
        );
        // Octets above 255 are not valid IPv4 components
        assert!(matches!(
            parse_pasv_reply("227 (300,0,0,1,19,136)"),
            Err(PasvError::BadNumber(_))
        ));
    }

    /// In-process FTP server speaking just enough protocol for one STOR
    async fn mock_ftp_server(
        control: TcpListener,
        received: tokio::sync::oneshot::Sender<Vec<u8>>,
    ) {
        let mut received = Some(received);
        let (stream, _) = control.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let data_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let data_port = data_listener.local_addr().unwrap().port();

        write_half.write_all(b"220 mock ready\r\n").await.unwrap();

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let command = line.trim();

            if command.starts_with("USER") {
                write_half.write_all(b"331 need password\r\n").await.unwrap();
            } else if command.starts_with("PASS") {
                write_half.write_all(b"230 logged in\r\n").await.unwrap();
            } else if command == "PASV" {
                let reply = format!(
                    "227 Entering Passive Mode (127,0,0,1,{},{}).\r\n",
                    data_port / 256,
                    data_port % 256
                );
                write_half.write_all(reply.as_bytes()).await.unwrap();
            } else if command.starts_with("STOR") {
                write_half.write_all(b"150 ok to send\r\n").await.unwrap();

                let (mut data, _) = data_listener.accept().await.unwrap();
                let mut bytes = Vec::new();
                data.read_to_end(&mut bytes).await.unwrap();
                received.take().unwrap().send(bytes).unwrap();

                write_half.write_all(b"226 transfer complete\r\n").await.unwrap();
            } else if command == "QUIT" {
                write_half.write_all(b"221 bye\r\n").await.unwrap();
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_upload_round_trip_against_mock_server() {
        let control = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = control.local_addr().unwrap().to_string();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let server = tokio::spawn(mock_ftp_server(control, tx));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naruto.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"fake image bytes").unwrap();
        drop(file);

        let mut client = FtpClient::connect(&addr, "user", "secret").await.unwrap();
        client.upload_file(&path).await.unwrap();
        client.close().await.unwrap();

        let received = rx.await.unwrap();
        assert_eq!(received, b"fake image bytes");

        server.await.unwrap();
    }
}
