//! Transports carry JSON-RPC messages between a server and its client.

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout},
    sync::mpsc,
};

use crate::McpError;

/// A bidirectional message channel to a single client.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Wait for the next message. `None` once the client has gone away.
    async fn receive(&mut self) -> Result<Option<String>, McpError>;

    /// Deliver a message to the client.
    async fn send(&mut self, message: String) -> Result<(), McpError>;

    /// Stop sending. Messages may still be received until the other end closes.
    async fn close(&mut self) -> Result<(), McpError>;
}

/// Messages over the standard streams, one per line.
#[derive(Debug)]
pub struct StdioTransport {
    reader: BufReader<Stdin>,
    writer: Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdioTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        let mut line = String::new();

        loop {
            line.clear();

            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }

            // Blank lines between messages are skipped
            let message = line.trim();
            if !message.is_empty() {
                return Ok(Some(message.to_string()));
            }
        }
    }

    async fn send(&mut self, message: String) -> Result<(), McpError> {
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.writer.flush().await?;

        Ok(())
    }
}

/// In-process transport, used to drive a server from the same program.
#[derive(Debug)]
pub struct ChannelTransport {
    sender: Option<mpsc::UnboundedSender<String>>,
    receiver: mpsc::UnboundedReceiver<String>,
}

impl ChannelTransport {
    /// Create two connected ends. Messages sent on one are received by the other.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        (
            Self {
                sender: Some(a_tx),
                receiver: b_rx,
            },
            Self {
                sender: Some(b_tx),
                receiver: a_rx,
            },
        )
    }
}

impl Transport for ChannelTransport {
    async fn receive(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.receiver.recv().await)
    }

    async fn send(&mut self, message: String) -> Result<(), McpError> {
        self.sender
            .as_ref()
            .ok_or(McpError::ConnectionClosed)?
            .send(message)
            .map_err(|_| McpError::ConnectionClosed)
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.sender = None;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn channel_pair() {
        let (mut client, mut server) = ChannelTransport::pair();

        Transport::send(&mut client, "ping".to_string()).await.unwrap();
        assert_eq!(
            Transport::receive(&mut server).await.unwrap(),
            Some("ping".to_string())
        );

        Transport::send(&mut server, "pong".to_string()).await.unwrap();
        assert_eq!(
            Transport::receive(&mut client).await.unwrap(),
            Some("pong".to_string())
        );
    }

    #[tokio::test]
    async fn closed_channel() {
        let (mut client, mut server) = ChannelTransport::pair();

        Transport::close(&mut client).await.unwrap();
        assert_eq!(Transport::receive(&mut server).await.unwrap(), None);
        assert!(matches!(
            Transport::send(&mut client, "late".to_string()).await,
            Err(McpError::ConnectionClosed)
        ));
    }
}
