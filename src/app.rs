//! Interactive terminal front end.
//!
//! Lines typed on stdin are either slash-commands (the buttons of a chat
//! page) or chat messages. Socket events and input lines are handled one at
//! a time on a single task, in arrival order.

use colored::*;
use std::io::Write;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::controller::ChatController;
use crate::error::Result;
use crate::health;
use crate::render::{self, StreamPrinter};
use crate::transport::{self, SocketEvent, SocketHandle};

pub const HELP: &str = "\
Commands:
  /connect          open the session socket
  /disconnect       close it (code 1000)
  /session [id]     show or set the session id used by the next /connect
  /new              generate a fresh session id
  /user <id>        set the user id used by the next /connect
  /status           show the connection status
  /feed             redraw the whole feed, newest first
  /health           probe the backend's /healthz endpoint
  /help             show this help
  /quit             disconnect and exit
Anything else is sent as a chat message.";

/// What the loop should do after a line.
#[derive(Debug)]
pub enum Flow {
    Continue,
    /// A socket was spawned; its events arrive on this receiver.
    Opened(mpsc::UnboundedReceiver<SocketEvent>),
    Quit,
}

pub struct App<W: Write> {
    controller: ChatController,
    printer: StreamPrinter,
    config: ClientConfig,
    socket: Option<SocketHandle>,
    out: W,
}

impl<W: Write> App<W> {
    pub fn new(config: ClientConfig, out: W) -> Self {
        let mut controller = ChatController::new();
        controller.set_session_id(config.session_id.clone());
        Self {
            controller,
            printer: StreamPrinter::new(),
            config,
            socket: None,
            out,
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Drive the session until `/quit` or end of input.
    pub async fn run<S>(mut self, mut lines: S) -> Result<W>
    where
        S: Stream<Item = std::io::Result<String>> + Unpin,
    {
        writeln!(self.out, "{}", render::status_line(self.controller.status()))?;
        writeln!(self.out, "{}", "Type /help for commands.".dimmed())?;

        let mut events = None;
        if self.config.connect_on_start {
            if let Flow::Opened(rx) = self.connect()? {
                events = Some(rx);
            }
        }

        loop {
            tokio::select! {
                line = lines.next() => {
                    let Some(line) = line else { break };
                    match self.handle_line(&line?).await? {
                        Flow::Continue => {}
                        Flow::Opened(rx) => events = Some(rx),
                        Flow::Quit => break,
                    }
                }
                event = next_event(&mut events) => {
                    match event {
                        Some(event) => {
                            let closed = matches!(event, SocketEvent::Closed { .. });
                            self.handle_event(event)?;
                            if closed {
                                events = None;
                            }
                        }
                        None => events = None,
                    }
                }
            }
        }

        self.shutdown(events).await?;
        Ok(self.out)
    }

    /// Close the socket, if any, and wait for its final event.
    async fn shutdown(&mut self, events: Option<mpsc::UnboundedReceiver<SocketEvent>>) -> Result<()> {
        let Some(mut events) = events else {
            return Ok(());
        };
        if let (Some(close), Some(socket)) = (self.controller.disconnect(), &self.socket) {
            socket.close(Some(close));
        }
        while let Some(event) = events.recv().await {
            let closed = matches!(event, SocketEvent::Closed { .. });
            self.handle_event(event)?;
            if closed {
                break;
            }
        }
        Ok(())
    }

    // -- socket events ------------------------------------------------------

    pub fn handle_event(&mut self, event: SocketEvent) -> Result<()> {
        match event {
            SocketEvent::Open => {
                self.controller.on_open();
                self.print_status()?;
            }
            SocketEvent::Message(raw) => {
                let update = self.controller.receive(&raw);
                let text = self.printer.render(self.controller.feed(), &update);
                if !text.is_empty() {
                    write!(self.out, "{}", text)?;
                    self.out.flush()?;
                }
            }
            SocketEvent::Error(err) => {
                if self.controller.on_error(&err) {
                    if let Some(socket) = &self.socket {
                        socket.close(None);
                    }
                }
                self.print_status()?;
            }
            SocketEvent::Closed { code, reason } => {
                debug!(?code, %reason, "socket closed");
                self.controller.on_close();
                self.socket = None;
                write!(self.out, "{}", self.printer.finish_any())?;
                self.print_status()?;
            }
        }
        Ok(())
    }

    // -- user input ---------------------------------------------------------

    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let trimmed = line.trim();
        let (command, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (trimmed, ""),
        };

        match command {
            "/quit" | "/exit" => return Ok(Flow::Quit),
            "/connect" => return self.connect(),
            "/disconnect" => {
                if let (Some(close), Some(socket)) = (self.controller.disconnect(), &self.socket) {
                    socket.close(Some(close));
                }
            }
            "/session" => {
                if !arg.is_empty() {
                    self.controller.set_session_id(arg);
                }
                self.print_session()?;
            }
            "/new" => {
                self.controller.generate_session_id();
                self.print_session()?;
            }
            "/user" => {
                self.config.user_id = arg.to_string();
                let shown = if arg.is_empty() { "anonymous" } else { arg };
                writeln!(self.out, "{} {}", "User:".dimmed(), shown)?;
            }
            "/status" => self.print_status()?,
            "/feed" => {
                writeln!(self.out, "{}", render::render_feed(self.controller.feed()))?;
            }
            "/health" => self.print_health().await?,
            "/help" => writeln!(self.out, "{}", HELP)?,
            cmd if cmd.starts_with('/') => {
                writeln!(
                    self.out,
                    "{}",
                    format!("Unknown command {}; try /help", cmd).bright_red()
                )?;
            }
            _ => self.send(line)?,
        }
        Ok(Flow::Continue)
    }

    fn connect(&mut self) -> Result<Flow> {
        let session_id = self.controller.session_id().to_string();
        let Some(url) = self
            .controller
            .connect(&self.config.host, &session_id, &self.config.user_id)
        else {
            return Ok(Flow::Continue);
        };

        self.print_session()?;
        writeln!(self.out, "{}", format!("Connecting to {}", url).dimmed())?;
        let (socket, events) = transport::spawn(url);
        self.socket = Some(socket);
        Ok(Flow::Opened(events))
    }

    fn send(&mut self, line: &str) -> Result<()> {
        // The socket task may have ended with its Closed event still queued.
        let Some(socket) = self.socket.as_ref().filter(|s| !s.is_closed()) else {
            debug!("message ignored, no live socket");
            return Ok(());
        };
        let socket = socket.clone();

        self.controller.composer_mut().draft = line.to_string();
        let Some(message) = self.controller.submit() else {
            return Ok(());
        };

        write!(self.out, "{}", self.printer.finish_any())?;
        if let Some(entry) = self.controller.feed().entries().first() {
            writeln!(self.out, "{}", render::render_entry(entry))?;
        }
        if let Err(e) = socket.send(&message) {
            debug!(error = %e, "message not sent, socket gone");
        }
        Ok(())
    }

    // -- output -------------------------------------------------------------

    fn print_status(&mut self) -> Result<()> {
        write!(self.out, "{}", self.printer.finish_any())?;
        writeln!(self.out, "{}", render::status_line(self.controller.status()))?;
        Ok(())
    }

    fn print_session(&mut self) -> Result<()> {
        let id = self.controller.session_id();
        let shown = if id.is_empty() { "(generated on connect)" } else { id };
        writeln!(self.out, "{} {}", "Session:".dimmed(), shown)?;
        Ok(())
    }

    async fn print_health(&mut self) -> Result<()> {
        match health::probe(&self.config.host).await {
            Ok(report) => {
                let app = report.app.as_deref().unwrap_or("backend");
                let line = format!("{}: {}", app, report.status);
                if report.is_ok() {
                    writeln!(self.out, "{}", line.bright_green())?;
                } else {
                    writeln!(self.out, "{}", line.bright_yellow())?;
                }
            }
            Err(e) => {
                warn!(error = %e, "health probe failed");
                writeln!(self.out, "{}", format!("Health check failed: {}", e).bright_red())?;
            }
        }
        Ok(())
    }
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<SocketEvent>>) -> Option<SocketEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
