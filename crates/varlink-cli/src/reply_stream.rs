//! Reply handling for `varlink call`.
//!
//! A [`ReplyStream`] prints every reply it receives and decides, from the
//! reply and the call flags, whether more replies should follow. It settles
//! on exactly one [`CallOutcome`] per call.

use std::io::Write;
use std::process::ExitCode;

use tracing::debug;

use crate::errors::ErrorKind;
use crate::event_loop::{ReplyHandler, ReplyState};
use crate::output::{Palette, render_parameters};
use crate::protocol::{CallFlags, ReplyEvent};

/// Final result of one call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum CallOutcome {
    Success,
    /// The service replied with the named error.
    RemoteError(String),
    LocalFailure(ErrorKind),
    /// The operator interrupted the wait.
    Canceled,
}

impl CallOutcome {
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Success | Self::Canceled => ExitCode::SUCCESS,
            Self::RemoteError(_) => ErrorKind::RemoteError.exit_code(),
            Self::LocalFailure(kind) => kind.exit_code(),
        }
    }
}

pub(crate) struct ReplyStream<'a, W: Write, E: Write> {
    flags: CallFlags,
    palette: Palette,
    stdout: &'a mut W,
    stderr: &'a mut E,
    state: ReplyState,
    outcome: Option<CallOutcome>,
}

impl<'a, W: Write, E: Write> ReplyStream<'a, W, E> {
    pub(crate) fn new(
        flags: CallFlags,
        palette: Palette,
        stdout: &'a mut W,
        stderr: &'a mut E,
    ) -> Self {
        Self {
            flags,
            palette,
            stdout,
            stderr,
            state: ReplyState::AwaitingReply,
            outcome: None,
        }
    }

    pub(crate) fn into_outcome(self) -> Option<CallOutcome> {
        self.outcome
    }

    fn finish(&mut self, outcome: CallOutcome) -> ReplyState {
        debug!(?outcome, "call finished");
        self.outcome = Some(outcome);
        self.state = ReplyState::Done;
        self.state
    }

    fn print_parameters(&mut self, reply: &ReplyEvent) -> Result<(), CallOutcome> {
        let text = match render_parameters(reply.parameters.as_ref(), self.palette) {
            Ok(text) => text,
            Err(error) => {
                let _ = writeln!(self.stderr, "Unable to read message: {error}");
                return Err(CallOutcome::LocalFailure(ErrorKind::InvalidJson));
            }
        };
        writeln!(self.stdout, "{text}")
            .and_then(|()| self.stdout.flush())
            .map_err(|_| CallOutcome::LocalFailure(ErrorKind::CallFailed))
    }
}

impl<W: Write, E: Write> ReplyHandler for ReplyStream<'_, W, E> {
    fn on_reply(&mut self, reply: ReplyEvent) -> ReplyState {
        if self.state == ReplyState::Done {
            return self.state;
        }
        if let Some(name) = reply.error.as_deref() {
            let _ = writeln!(self.stderr, "Call failed with error: {name}");
        }
        if let Err(outcome) = self.print_parameters(&reply) {
            return self.finish(outcome);
        }
        if let Some(name) = reply.error {
            return self.finish(CallOutcome::RemoteError(name));
        }
        if reply.continues && self.flags.contains(CallFlags::MORE) {
            return ReplyState::AwaitingReply;
        }
        self.finish(CallOutcome::Success)
    }
}
