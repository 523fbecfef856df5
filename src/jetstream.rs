//! Websocket transport for a Jetstream endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::config::KeepaliveConfig;
use crate::error::{Error, Result};
use crate::session::EventSource;

/// A live Jetstream subscription. Sends a ping every `ping_interval` and
/// fails once `ping_timeout` passes without the matching pong.
pub struct JetstreamSource {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    keepalive: KeepaliveConfig,
    ping: Interval,
    awaiting_pong: Option<Instant>,
}

impl JetstreamSource {
    pub async fn connect(url: &str, keepalive: KeepaliveConfig) -> Result<Self> {
        debug!(%url, "connecting to jetstream");
        let (ws, resp) = timeout(keepalive.open_timeout, connect_async(url))
            .await
            .map_err(|_| Error::ConnectTimeout(keepalive.open_timeout))?
            .map_err(|source| Error::Connect {
                url: url.to_owned(),
                source,
            })?;
        trace!(status = %resp.status(), "websocket handshake complete");
        let period = keepalive.ping_interval.max(Duration::from_millis(1));
        let mut ping = interval_at(Instant::now() + period, period);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(Self {
            ws,
            keepalive,
            ping,
            awaiting_pong: None,
        })
    }

    /// Ping unless one is already outstanding.
    async fn keepalive_tick(&mut self) -> Result<()> {
        if self.awaiting_pong.is_none() {
            trace!("sending keepalive ping");
            self.ws.send(Message::Ping(Vec::new())).await?;
            self.awaiting_pong = Some(Instant::now());
        }
        Ok(())
    }
}

enum Wake {
    Ping,
    PongOverdue,
    Frame(Option<std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

#[async_trait]
impl EventSource for JetstreamSource {
    async fn next_message(&mut self) -> Result<Option<String>> {
        loop {
            let pong_due = self
                .awaiting_pong
                .map(|sent| sent + self.keepalive.ping_timeout);
            let wake = tokio::select! {
                _ = self.ping.tick() => Wake::Ping,
                _ = sleep_until(pong_due.unwrap_or_else(Instant::now)), if pong_due.is_some() => {
                    Wake::PongOverdue
                }
                frame = self.ws.next() => Wake::Frame(frame),
            };
            let frame = match wake {
                Wake::Ping => {
                    self.keepalive_tick().await?;
                    continue;
                }
                Wake::PongOverdue => {
                    return Err(Error::KeepaliveTimeout(self.keepalive.ping_timeout));
                }
                Wake::Frame(frame) => frame,
            };
            match frame {
                None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => debug!("dropping non-utf8 binary frame"),
                },
                Some(Ok(Message::Pong(_))) => {
                    self.awaiting_pong = None;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server sent close");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
            }
        }
    }
}
