//! Time-boxed consumption of an event stream.
//!
//! The session is a small state machine:
//!
//! ```text
//! Connecting -> Waiting <-> Evaluating
//!                  |
//!                  +-> Expired     (deadline reached)
//!                  +-> Terminated  (stream closed or failed)
//! ```
//!
//! The clock starts before connecting, and the connect itself races the
//! deadline. Each wait races the deadline against one receive bounded by the
//! receive timeout. A receive timeout only sends the machine back to `Waiting`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep_until, timeout};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};

/// A connected stream of text frames.
#[async_trait]
pub trait EventSource: Send {
    /// Next frame, or `None` once the peer closed the stream.
    async fn next_message(&mut self) -> Result<Option<String>>;
}

#[derive(Debug)]
pub enum SessionState {
    Connecting,
    Waiting,
    Evaluating(String),
    Expired,
    Terminated(Option<Error>),
}

/// Why a session stopped.
#[derive(Debug)]
pub enum Termination {
    /// The window elapsed.
    Expired,
    /// The peer closed the stream before the window elapsed.
    Closed,
    /// Unrecoverable transport failure.
    Failed(Error),
}

impl Termination {
    pub fn is_expired(&self) -> bool {
        matches!(self, Termination::Expired)
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub termination: Termination,
    pub messages: u64,
    pub idle_timeouts: u64,
    pub elapsed: Duration,
}

/// Drives an [`EventSource`] for a fixed wall-clock window.
#[derive(Debug, Clone)]
pub struct StreamSession {
    duration: Duration,
    receive_timeout: Duration,
}

impl StreamSession {
    pub fn new(duration: Duration, receive_timeout: Duration) -> Self {
        Self {
            duration,
            receive_timeout,
        }
    }

    /// Connect via `connect`, then hand every frame to `on_message` until the
    /// window closes or the stream ends. `on_tick` is called on every pass
    /// through `Waiting` with the time elapsed so far.
    ///
    /// The deadline starts before connecting. A connect failure, or a connect
    /// still pending when the window closes, is returned as `Err`; everything
    /// after that is reported in the [`SessionReport`].
    pub async fn run<S, C, M, T>(
        &self,
        connect: C,
        mut on_message: M,
        mut on_tick: T,
    ) -> Result<SessionReport>
    where
        S: EventSource,
        C: Future<Output = Result<S>>,
        M: FnMut(String),
        T: FnMut(Duration),
    {
        let mut state = SessionState::Connecting;
        let mut source: Option<S> = None;
        let mut connect = Some(connect);
        let started = Instant::now();
        let deadline = started + self.duration;
        let mut messages = 0u64;
        let mut idle_timeouts = 0u64;

        let termination = loop {
            state = match state {
                SessionState::Connecting => {
                    let Some(fut) = connect.take() else {
                        break Termination::Closed;
                    };
                    let src = tokio::select! {
                        res = fut => res?,
                        _ = sleep_until(deadline) => {
                            warn!(duration = ?self.duration, "window closed before stream connected");
                            return Err(Error::ConnectTimeout(self.duration));
                        }
                    };
                    source = Some(src);
                    info!(remaining = ?deadline.saturating_duration_since(Instant::now()), "stream connected");
                    SessionState::Waiting
                }
                SessionState::Waiting => {
                    let Some(src) = source.as_mut() else {
                        break Termination::Closed;
                    };
                    on_tick(started.elapsed());
                    if Instant::now() >= deadline {
                        SessionState::Expired
                    } else {
                        tokio::select! {
                            biased;
                            _ = sleep_until(deadline) => SessionState::Expired,
                            recv = timeout(self.receive_timeout, src.next_message()) => match recv {
                                Err(_) => {
                                    idle_timeouts += 1;
                                    trace!("no event within receive timeout");
                                    SessionState::Waiting
                                }
                                Ok(Ok(Some(msg))) => SessionState::Evaluating(msg),
                                Ok(Ok(None)) => SessionState::Terminated(None),
                                Ok(Err(e)) => SessionState::Terminated(Some(e)),
                            },
                        }
                    }
                }
                SessionState::Evaluating(msg) => {
                    messages += 1;
                    on_message(msg);
                    SessionState::Waiting
                }
                SessionState::Expired => {
                    debug!(messages, "sampling window expired");
                    break Termination::Expired;
                }
                SessionState::Terminated(None) => {
                    info!(messages, "stream closed by peer");
                    break Termination::Closed;
                }
                SessionState::Terminated(Some(e)) => {
                    error!(error = %e, messages, "stream failed");
                    break Termination::Failed(e);
                }
            };
        };

        Ok(SessionReport {
            termination,
            messages,
            idle_timeouts,
            elapsed: started.elapsed(),
        })
    }
}
