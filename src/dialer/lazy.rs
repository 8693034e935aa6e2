//! Deferred-connect stream
//!
//! A [`LazyStream`] is created unconnected. The dial runs on the first read
//! or write; a flush or shutdown before that is a no-op.

use super::Dialer;
use crate::error::SocksError;
use crate::socks::TargetAddr;
use futures::future::BoxFuture;
use futures::ready;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

enum State<S> {
    Idle,
    Connecting(BoxFuture<'static, Result<S, SocksError>>),
    Connected(S),
    Failed(io::ErrorKind),
}

/// Stream that connects through a [`Dialer`] on first use
pub struct LazyStream<D: Dialer> {
    dialer: Arc<D>,
    target: TargetAddr,
    state: State<D::Stream>,
}

impl<D: Dialer> LazyStream<D> {
    /// Create an unconnected stream to `target`
    pub fn new(dialer: Arc<D>, target: TargetAddr) -> Self {
        LazyStream {
            dialer,
            target,
            state: State::Idle,
        }
    }

    /// Target this stream connects to
    pub fn target(&self) -> &TargetAddr {
        &self.target
    }

    /// Whether the tunnel is up
    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    /// Connect now instead of on first use
    pub async fn connect(&mut self) -> io::Result<()> {
        futures::future::poll_fn(|cx| self.poll_connect(cx)).await
    }

    /// Take the connected stream, if any
    pub fn into_inner(self) -> Option<D::Stream> {
        match self.state {
            State::Connected(stream) => Some(stream),
            _ => None,
        }
    }

    fn poll_connect(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        loop {
            match &mut self.state {
                State::Connected(_) => return Poll::Ready(Ok(())),
                State::Failed(kind) => {
                    return Poll::Ready(Err(io::Error::new(
                        *kind,
                        format!("connection to {} failed earlier", self.target),
                    )))
                }
                State::Idle => {
                    let dialer = self.dialer.clone();
                    let target = self.target.clone();
                    self.state =
                        State::Connecting(Box::pin(async move { dialer.dial(&target).await }));
                }
                State::Connecting(fut) => {
                    let result = ready!(fut.as_mut().poll(cx));
                    match result {
                        Ok(stream) => self.state = State::Connected(stream),
                        Err(e) => {
                            let err = io::Error::from(e);
                            self.state = State::Failed(err.kind());
                            return Poll::Ready(Err(err));
                        }
                    }
                }
            }
        }
    }

    fn connected(&mut self) -> io::Result<Pin<&mut D::Stream>> {
        match &mut self.state {
            State::Connected(stream) => Ok(Pin::new(stream)),
            _ => Err(io::Error::new(io::ErrorKind::NotConnected, "not connected")),
        }
    }
}

impl<D: Dialer> fmt::Debug for LazyStream<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Idle => "idle",
            State::Connecting(_) => "connecting",
            State::Connected(_) => "connected",
            State::Failed(_) => "failed",
        };
        f.debug_struct("LazyStream")
            .field("dialer", &self.dialer)
            .field("target", &self.target)
            .field("state", &state)
            .finish()
    }
}

impl<D: Dialer> AsyncRead for LazyStream<D> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_connect(cx))?;
        this.connected()?.poll_read(cx, buf)
    }
}

impl<D: Dialer> AsyncWrite for LazyStream<D> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.poll_connect(cx))?;
        this.connected()?.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.state {
            State::Idle | State::Failed(_) => Poll::Ready(Ok(())),
            _ => {
                ready!(this.poll_connect(cx))?;
                this.connected()?.poll_flush(cx)
            }
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match this.state {
            State::Idle | State::Failed(_) => Poll::Ready(Ok(())),
            _ => {
                ready!(this.poll_connect(cx))?;
                this.connected()?.poll_shutdown(cx)
            }
        }
    }
}
