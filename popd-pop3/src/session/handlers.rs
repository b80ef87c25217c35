use std::{borrow::Cow, sync::Arc};

use popd_common::{
    error::SessionError, incoming, internal, outgoing, traits::FiniteStateMachine,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite};

use super::{
    Session,
    response::{Reply, text},
};
use crate::{
    command::{Command, ParseError, Verb},
    fsm::Transition,
    view::MailboxView,
};

/// How a command went, as far as the session loop is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Answered with `+OK`
    Success,
    /// Answered with `-ERR`; the session carries on
    Failure,
    /// The session is over
    Terminate,
}

/// Parse a message position; anything but a positive integer matches nothing
fn parse_position(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok().filter(|position| *position > 0)
}

/// Most message content held in memory at once while answering RETR
const RETR_CHUNK: u64 = 8 * 1024;

/// Rewrites message content for the wire, one bounded chunk at a time
///
/// Every line terminator, LF or CRLF, becomes CRLF and a `.` starting a line
/// is doubled (RFC 1939 Section 3). Chunks come from `read_until(b'\n')`
/// under a length limit, so a line may arrive split across several of them.
#[derive(Debug)]
struct DotStuffer {
    at_line_start: bool,
    /// A chunk ended in CR, which may be half of a CRLF
    pending_cr: bool,
}

impl Default for DotStuffer {
    fn default() -> Self {
        Self {
            at_line_start: true,
            pending_cr: false,
        }
    }
}

impl DotStuffer {
    fn push(&mut self, chunk: &[u8], out: &mut Vec<u8>) {
        out.clear();

        if self.pending_cr {
            self.pending_cr = false;
            if chunk.first() != Some(&b'\n') {
                out.push(b'\r');
                self.at_line_start = false;
            }
        }

        let (content, line_end) = match chunk.strip_suffix(b"\n") {
            Some(content) => (content.strip_suffix(b"\r").unwrap_or(content), true),
            None => match chunk.strip_suffix(b"\r") {
                Some(content) => {
                    self.pending_cr = true;
                    (content, false)
                }
                None => (chunk, false),
            },
        };

        if self.at_line_start && content.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(content);

        if line_end {
            out.extend_from_slice(b"\r\n");
            self.at_line_start = true;
        } else if !content.is_empty() {
            self.at_line_start = false;
        }
    }

    /// Terminate a final line that had no line feed of its own
    fn finish(self, out: &mut Vec<u8>) {
        out.clear();
        if self.pending_cr || !self.at_line_start {
            out.extend_from_slice(b"\r\n");
        }
    }
}

impl<Stream: AsyncRead + AsyncWrite + Unpin + Send + Sync> Session<Stream> {
    /// Parse one command line and run it, queueing its response
    pub(super) async fn dispatch(&mut self, line: &[u8]) -> Result<Outcome, SessionError> {
        let command = match Command::try_from(line) {
            Ok(command) => command,
            Err(ParseError::Blank) => {
                self.reply(&Reply::err(text::BLANK)).await?;
                return Err(SessionError::Protocol(ParseError::Blank.to_string()));
            }
            Err(err @ ParseError::Unrecognized(_)) => {
                incoming!("{err}");
                return self.fail(text::UNRECOGNIZED).await;
            }
        };

        incoming!("{command}");

        let verb = command.verb();
        match verb {
            Verb::Top | Verb::Uidl | Verb::Apop => self.fail(text::NOT_IMPLEMENTED).await,
            _ if !self.state.admits(verb) => {
                internal!(level = DEBUG, "{verb} is not allowed in {}", self.state);
                self.fail(text::BAD_SEQUENCE).await
            }
            Verb::User => self.user(&command).await,
            Verb::Pass => self.pass(&command).await,
            Verb::Stat => self.stat().await,
            Verb::List => self.list(&command).await,
            Verb::Retr => self.retr(&command).await,
            Verb::Dele => self.dele(&command).await,
            Verb::Rset => self.rset().await,
            Verb::Noop => self.succeed(String::new()).await,
            Verb::Quit => self.quit().await,
        }
    }

    async fn succeed(
        &mut self,
        message: impl Into<Cow<'static, str>> + Send,
    ) -> Result<Outcome, SessionError> {
        self.reply(&Reply::ok(message)).await?;
        Ok(Outcome::Success)
    }

    async fn fail(&mut self, message: &'static str) -> Result<Outcome, SessionError> {
        self.reply(&Reply::err(message)).await?;
        Ok(Outcome::Failure)
    }

    fn transition(&mut self, input: Transition) {
        let from = self.state;
        self.state = self.state.transition(input, &mut self.session_state);

        if from != self.state {
            tracing::debug!("Transitioned from {from} to {}", self.state);
        }
    }

    fn view(&self) -> Result<&MailboxView, SessionError> {
        self.view
            .as_ref()
            .ok_or_else(|| SessionError::Protocol(format!("No maildrop loaded in {}", self.state)))
    }

    fn view_mut(&mut self) -> Result<&mut MailboxView, SessionError> {
        let state = self.state;
        self.view
            .as_mut()
            .ok_or_else(|| SessionError::Protocol(format!("No maildrop loaded in {state}")))
    }

    async fn user(&mut self, command: &Command) -> Result<Outcome, SessionError> {
        let Some(name) = command.arg(0) else {
            return self.fail(text::SYNTAX_ARGUMENTS).await;
        };

        let known = self.store.user_exists(name).await.unwrap_or_else(|err| {
            internal!(level = ERROR, "Unable to look up user {name}: {err}");
            false
        });

        if known {
            self.transition(Transition::UserAccepted(name.to_string()));
            self.succeed(text::USER_ACCEPTED).await
        } else {
            self.transition(Transition::UserRejected);
            self.fail(text::NO_SUCH_USER).await
        }
    }

    async fn pass(&mut self, command: &Command) -> Result<Outcome, SessionError> {
        if command.arg(0).is_none() {
            return self.fail(text::SYNTAX_ARGUMENTS).await;
        }

        // Everything after the command name, spaces included
        let secret = command.rest();
        let Some(user) = self.session_state.pending_user().map(str::to_string) else {
            return Err(SessionError::Protocol(format!(
                "No pending user in {}",
                self.state
            )));
        };

        let valid = self.store.verify(&user, secret).await.unwrap_or_else(|err| {
            internal!(level = ERROR, "Unable to verify credentials of {user}: {err}");
            false
        });

        if !valid {
            internal!(level = INFO, "Failed login for {user} from {}", self.peer);
            self.transition(Transition::PassRejected);
            return self.fail(text::INVALID_PASSWORD).await;
        }

        match MailboxView::load(&user, Arc::clone(&self.store)).await {
            Ok(view) => {
                internal!(
                    level = INFO,
                    "{user} logged in from {} with {} messages",
                    self.peer,
                    view.length(true)
                );
                self.view = Some(view);
                self.transition(Transition::PassAccepted);
                self.succeed(text::PASS_ACCEPTED).await
            }
            Err(err) => {
                internal!(level = ERROR, "Unable to load maildrop of {user}: {err}");
                self.transition(Transition::PassRejected);
                self.fail(text::MAILDROP_LOCKED).await
            }
        }
    }

    async fn stat(&mut self) -> Result<Outcome, SessionError> {
        let view = self.view()?;
        let message = format!("{} {}", view.length(false), view.total_size());

        self.succeed(message).await
    }

    async fn list(&mut self, command: &Command) -> Result<Outcome, SessionError> {
        let view = self.view()?;

        if let Some(arg) = command.arg(0) {
            return match parse_position(arg).and_then(|position| view.retrieve(position)) {
                Some(slot) => {
                    let message = format!("{} {}", slot.position(), slot.size());
                    self.succeed(message).await
                }
                None => {
                    let message = format!(
                        "{}, only {} messages in maildrop",
                        text::NO_SUCH_MESSAGE,
                        view.length(false)
                    );
                    self.reply(&Reply::err(message)).await?;
                    Ok(Outcome::Failure)
                }
            };
        }

        let header = Reply::ok(format!(
            "{} messages ({} octets)",
            view.length(false),
            view.total_size()
        ));
        let listing: Vec<String> = view
            .slots()
            .map(|slot| format!("{} {}", slot.position(), slot.size()))
            .collect();

        self.reply(&header).await?;
        for line in listing {
            outgoing!("{line}");
            self.connection.send(&line).await?;
        }
        outgoing!(".");
        self.connection.send(&".").await?;

        Ok(Outcome::Success)
    }

    async fn retr(&mut self, command: &Command) -> Result<Outcome, SessionError> {
        let Some(arg) = command.arg(0) else {
            return self.fail(text::SYNTAX_ARGUMENTS).await;
        };

        let view = self.view()?;
        let Some((position, size)) = parse_position(arg)
            .and_then(|position| view.retrieve(position))
            .map(|slot| (slot.position(), slot.size()))
        else {
            return self.fail(text::NO_SUCH_MESSAGE).await;
        };

        let mut reader = match view.open(position).await {
            Ok(reader) => reader,
            Err(err) => {
                internal!(level = WARN, "Unable to open message {position}: {err}");
                return self.fail(text::NO_SUCH_MESSAGE).await;
            }
        };

        self.reply(&Reply::ok(format!("{size} octets"))).await?;

        let mut chunk = Vec::new();
        let mut stuffed = Vec::new();
        let mut stuffer = DotStuffer::default();
        loop {
            chunk.clear();
            if (&mut reader)
                .take(RETR_CHUNK)
                .read_until(b'\n', &mut chunk)
                .await?
                == 0
            {
                break;
            }

            stuffer.push(&chunk, &mut stuffed);
            self.connection.send_raw(&stuffed).await?;
        }

        stuffer.finish(&mut stuffed);
        self.connection.send_raw(&stuffed).await?;

        outgoing!("<{size} octets>");
        outgoing!(".");
        self.connection.send(&".").await?;

        Ok(Outcome::Success)
    }

    async fn dele(&mut self, command: &Command) -> Result<Outcome, SessionError> {
        let Some(arg) = command.arg(0) else {
            return self.fail(text::SYNTAX_ARGUMENTS).await;
        };

        let Some(position) = parse_position(arg) else {
            return self.fail(text::NO_SUCH_MESSAGE).await;
        };

        if self.view_mut()?.mark_deleted(position).is_err() {
            return self.fail(text::NO_SUCH_MESSAGE).await;
        }

        self.succeed(format!("message {position} deleted")).await
    }

    async fn rset(&mut self) -> Result<Outcome, SessionError> {
        let restored = self.view_mut()?.undelete_all();

        self.succeed(format!("{restored} messages restored")).await
    }

    async fn quit(&mut self) -> Result<Outcome, SessionError> {
        self.transition(Transition::Quit);

        let committed = match self.view.take() {
            Some(view) => match view.commit().await {
                Ok(removed) => {
                    internal!(level = INFO, "Removed {removed} messages");
                    true
                }
                Err(err) => {
                    internal!(level = ERROR, "Unable to remove deleted messages: {err}");
                    false
                }
            },
            None => true,
        };

        if committed {
            self.reply(&Reply::ok(text::CLOSING)).await?;
        } else {
            self.reply(&Reply::err(text::NOT_REMOVED)).await?;
        }

        Ok(Outcome::Terminate)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Run `chunks` through a fresh stuffer, as RETR would
    fn stuffed(chunks: &[&[u8]]) -> Vec<u8> {
        let mut stuffer = DotStuffer::default();
        let mut out = Vec::new();
        let mut wire = Vec::new();

        for chunk in chunks {
            stuffer.push(chunk, &mut out);
            wire.extend_from_slice(&out);
        }
        stuffer.finish(&mut out);
        wire.extend_from_slice(&out);

        wire
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("1"), Some(1));
        assert_eq!(parse_position("42"), Some(42));
        assert_eq!(parse_position("0"), None);
        assert_eq!(parse_position("-1"), None);
        assert_eq!(parse_position("one"), None);
        assert_eq!(parse_position(""), None);
    }

    #[test]
    fn test_stuff_lines() {
        assert_eq!(stuffed(&[b"Subject: hi\r\n"]), b"Subject: hi\r\n");
        assert_eq!(stuffed(&[b"bare lf\n"]), b"bare lf\r\n");
        assert_eq!(stuffed(&[b"no terminator"]), b"no terminator\r\n");
        assert_eq!(stuffed(&[b".\r\n"]), b"..\r\n");
        assert_eq!(stuffed(&[b".hidden\n", b"shown\n"]), b"..hidden\r\nshown\r\n");
        assert_eq!(stuffed(&[b"\r\n"]), b"\r\n");
        assert_eq!(stuffed(&[]), b"");
    }

    #[test]
    fn test_stuff_split_lines() {
        // Only the first chunk of a long line starts it
        assert_eq!(stuffed(&[b".abc", b".def\n"]), b"..abc.def\r\n");
        assert_eq!(stuffed(&[b"", b".x\n"]), b"..x\r\n");

        // CRLF split across two chunks stays one terminator
        assert_eq!(stuffed(&[b"abc\r", b"\n", b".next\n"]), b"abc\r\n..next\r\n");

        // A CR that is not part of a CRLF is kept as content
        assert_eq!(stuffed(&[b"abc\r", b".def\n"]), b"abc\r.def\r\n");

        // Content ending in CR is still terminated once
        assert_eq!(stuffed(&[b"abc\r"]), b"abc\r\n");
    }
}
