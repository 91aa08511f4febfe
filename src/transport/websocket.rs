use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Received, Transport, TransportError};
use crate::config::ApiConfig;

pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WebSocketTransport {
    /// Open the podcast endpoint with the credential headers it expects.
    pub async fn connect(api: &ApiConfig) -> Result<Self, TransportError> {
        info!("Connecting to podcast API at {}", api.url);

        let mut request = api
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Connect(format!("Invalid URL {}: {}", api.url, e)))?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let headers = request.headers_mut();
        for (name, value) in [
            ("x-api-app-id", api.app_id.as_str()),
            ("x-api-access-key", api.access_key.as_str()),
            ("x-api-resource-id", api.resource_id.as_str()),
            ("x-api-app-key", api.app_key.as_str()),
            ("x-api-request-id", request_id.as_str()),
        ] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Connect(format!("Bad header {}: {}", name, e)))?;
            headers.insert(name, value);
        }

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        info!(
            status = %response.status(),
            request_id = %request_id,
            "WebSocket connected"
        );

        Ok(Self {
            stream,
            closed: false,
        })
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: Vec<u8>) -> Result<(), TransportError> {
        self.stream
            .send(Message::Binary(message))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn receive(&mut self) -> Result<Received, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Received::Message(data)),
                Some(Ok(Message::Text(text))) => return Ok(Received::Message(text.into_bytes())),
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "Server closed WebSocket");
                    self.closed = true;
                    return Ok(Received::Closed);
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed)) | None => {
                    self.closed = true;
                    return Ok(Received::Closed);
                }
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(()) => debug!("WebSocket closed"),
            Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {}
            Err(e) => warn!("Failed to close WebSocket cleanly: {}", e),
        }
    }
}
