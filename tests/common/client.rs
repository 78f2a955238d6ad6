//! Test WebSocket client.
//!
//! Sends typed client events and decodes server events, skipping
//! keepalive frames.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use stormer_proto::{ClientEvent, ServerEvent, decode, encode};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test board client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a test server's WebSocket endpoint.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Send a raw text frame.
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a client event.
    pub async fn send(&mut self, event: ClientEvent) -> anyhow::Result<()> {
        self.send_raw(&encode(&event)?).await
    }

    /// Receive a single event from the server.
    pub async fn recv(&mut self) -> anyhow::Result<ServerEvent> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive an event with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<ServerEvent> {
        timeout(dur, self.next_event()).await?
    }

    async fn next_event(&mut self) -> anyhow::Result<ServerEvent> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(decode(&text)?),
                Some(Ok(Message::Close(frame))) => anyhow::bail!("Connection closed: {frame:?}"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("Connection closed"),
            }
        }
    }

    /// Receive events until the given predicate returns true.
    #[allow(dead_code)]
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<ServerEvent>>
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        let mut events = Vec::new();
        loop {
            let event = self.recv().await?;
            let done = predicate(&event);
            events.push(event);
            if done {
                break;
            }
        }
        Ok(events)
    }

    /// Assert nothing arrives within a short window.
    #[allow(dead_code)]
    pub async fn assert_silent(&mut self) {
        if let Ok(Ok(event)) = timeout(Duration::from_millis(200), self.next_event()).await {
            panic!("unexpected event: {event:?}");
        }
    }

    /// Close the connection.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
