//! Push-event WebSocket.
//!
//! Opens the cloud's event socket with the client's auth headers and
//! exposes it as a [`Stream`] of raw message texts. The stream ends on a
//! close frame and yields one `Err` on a socket failure. It never
//! reconnects: recovery is the caller's decision.
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use hmip_api::websocket::EventStream;
//!
//! let mut events = EventStream::connect(&ws_url, &credentials, timeout).await?;
//! while let Some(message) = events.next().await {
//!     println!("{}", message?);
//! }
//! ```

use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::client::Credentials;
use crate::error::Error;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An open push-event connection.
pub struct EventStream {
    read: SplitStream<Socket>,
    write: SplitSink<Socket, Message>,
    finished: bool,
}

impl EventStream {
    /// Connect to the event socket. `timeout` bounds the handshake only.
    pub async fn connect(
        url: &Url,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, Error> {
        tracing::info!(url = %url, "Connecting to event WebSocket");

        let uri: tungstenite::http::Uri = url.as_str().parse().map_err(
            |e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()),
        )?;

        let request = ClientRequestBuilder::new(uri)
            .with_header("AUTHTOKEN", credentials.auth_token.expose_secret())
            .with_header("CLIENTAUTH", credentials.client_auth_token.expose_secret());

        let (socket, _response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })?
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        tracing::info!("Event WebSocket connected");

        let (write, read) = socket.split();
        Ok(Self {
            read,
            write,
            finished: false,
        })
    }

    /// Send a close frame. Dropping the stream also closes the socket,
    /// just less politely.
    pub async fn close(mut self) -> Result<(), Error> {
        self.write
            .send(Message::Close(None))
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))
    }
}

// ── Frame handling ───────────────────────────────────────────────────

enum Frame {
    Payload(String),
    Undecodable(Error),
    Skip,
    End,
}

/// The cloud sends JSON in binary frames; text frames are accepted too.
fn classify(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Payload(text.as_str().to_owned()),
        Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Frame::Payload(text),
            Err(e) => Frame::Undecodable(Error::Deserialization {
                message: format!("binary frame is not UTF-8: {e}"),
                body: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            }),
        },
        Message::Close(frame) => {
            if let Some(ref cf) = frame {
                tracing::info!(
                    code = %cf.code,
                    reason = %cf.reason,
                    "WebSocket close frame received"
                );
            } else {
                tracing::info!("WebSocket close frame received (no payload)");
            }
            Frame::End
        }
        Message::Ping(_) => {
            // tungstenite handles pong replies automatically
            tracing::trace!("WebSocket ping");
            Frame::Skip
        }
        Message::Pong(_) | Message::Frame(_) => Frame::Skip,
    }
}

impl Stream for EventStream {
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        loop {
            match ready!(self.read.poll_next_unpin(cx)) {
                Some(Ok(message)) => match classify(message) {
                    Frame::Payload(text) => return Poll::Ready(Some(Ok(text))),
                    Frame::Undecodable(e) => {
                        tracing::warn!(error = %e, "dropping undecodable frame");
                    }
                    Frame::Skip => {}
                    Frame::End => {
                        self.finished = true;
                        return Poll::Ready(None);
                    }
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Poll::Ready(Some(Err(Error::WebSocketConnect(e.to_string()))));
                }
                None => {
                    tracing::info!("WebSocket stream ended");
                    self.finished = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_frames_carry_payload() {
        let frame = classify(Message::Binary(br#"{"events":{}}"#.to_vec().into()));
        assert!(matches!(frame, Frame::Payload(ref t) if t == r#"{"events":{}}"#));
    }

    #[test]
    fn invalid_utf8_binary_frame_is_undecodable() {
        let frame = classify(Message::Binary(vec![b'{', 0xff, 0xfe, b'}'].into()));
        assert!(matches!(frame, Frame::Undecodable(Error::Deserialization { .. })));
    }

    #[test]
    fn text_frames_carry_payload() {
        let frame = classify(Message::Text("{}".into()));
        assert!(matches!(frame, Frame::Payload(ref t) if t == "{}"));
    }

    #[test]
    fn close_ends_and_ping_skips() {
        assert!(matches!(classify(Message::Close(None)), Frame::End));
        assert!(matches!(classify(Message::Ping(Vec::new().into())), Frame::Skip));
    }
}
