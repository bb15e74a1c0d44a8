//! Drives a reply handler until it is satisfied, the wait is interrupted or
//! the configured timeout expires.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use once_cell::sync::OnceCell;
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, trace};

use crate::errors::AppError;
use crate::protocol::ReplyEvent;
use crate::transport::{Channel, Poll};

static CANCEL_FLAG: OnceCell<Arc<AtomicBool>> = OnceCell::new();

/// Whether a reply handler expects further replies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ReplyState {
    AwaitingReply,
    Done,
}

/// Receives each reply of a pending call.
pub(crate) trait ReplyHandler {
    /// Consumes one reply. Never invoked again after returning
    /// [`ReplyState::Done`].
    fn on_reply(&mut self, reply: ReplyEvent) -> ReplyState;
}

pub(crate) struct EventLoop {
    canceled: Arc<AtomicBool>,
    timeout: Option<Duration>,
}

impl EventLoop {
    /// Creates a loop that observes SIGINT and SIGTERM.
    ///
    /// The handlers are installed once per process.
    pub(crate) fn new(timeout: Option<Duration>) -> Result<Self, AppError> {
        let canceled = CANCEL_FLAG
            .get_or_try_init(|| {
                let flag = Arc::new(AtomicBool::new(false));
                for signal in [SIGINT, SIGTERM] {
                    signal_hook::flag::register(signal, Arc::clone(&flag))?;
                }
                Ok::<_, std::io::Error>(flag)
            })
            .map_err(AppError::InstallSignals)?;
        Ok(Self::with_cancel_flag(Arc::clone(canceled), timeout))
    }

    pub(crate) fn with_cancel_flag(canceled: Arc<AtomicBool>, timeout: Option<Duration>) -> Self {
        Self { canceled, timeout }
    }

    /// Feeds replies from `channel` to `handler` until the handler is done.
    ///
    /// The channel is closed as soon as the handler returns
    /// [`ReplyState::Done`], and before returning [`AppError::Canceled`] or
    /// [`AppError::Timeout`]. A peer that hangs up first yields
    /// [`AppError::ConnectionClosed`]. A timeout too large to represent as a
    /// deadline means no deadline.
    pub(crate) fn process_all<C, H>(&self, channel: &mut C, handler: &mut H) -> Result<(), AppError>
    where
        C: Channel + ?Sized,
        H: ReplyHandler + ?Sized,
    {
        let deadline = self
            .timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));
        while !channel.is_closed() {
            if self.canceled.load(Ordering::SeqCst) {
                debug!("wait canceled by signal");
                channel.close();
                return Err(AppError::Canceled);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!("reply deadline passed");
                channel.close();
                return Err(AppError::Timeout);
            }
            match channel.poll_reply()? {
                Poll::Pending => trace!("no reply yet"),
                Poll::Closed => return Err(AppError::ConnectionClosed),
                Poll::Reply(reply) => {
                    if handler.on_reply(reply) == ReplyState::Done {
                        channel.close();
                    }
                }
            }
        }
        Ok(())
    }
}
