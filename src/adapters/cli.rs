//! CLI adapter: the interactive shopping session.
//!
//! Drives the read → build → run → display cycle against one open tool
//! session. The session itself is opened and released by
//! [`open_tool_session`] and [`run_with_session`], which bracket the loop;
//! [`run_chat`] and [`ask`] wrap the whole setup-then-dispatch sequence.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};
use url::Url;

use crate::agent::{builder, HistoryWindow, LlmClient, TurnExecutor, TurnResult};
use crate::error::{SetupError, TurnError};
use crate::mcp::{McpSession, ToolHost};
use crate::ui;
use crate::Result;

pub const PROMPT: &str = "ENTER YOUR QUERY: ";
pub const READY: &str = "E-commerce Assistant is ready! Type 'exit' or 'stop' to quit.";
pub const GOODBYE: &str = "Goodbye! Thanks for using the E-commerce Assistant.";
pub const EMPTY_HINT: &str = "Please enter a valid query or type 'exit' to quit.";
pub const INTERRUPTED: &str = "Interrupted by user. Goodbye!";
pub const ERROR_PREFIX: &str = "An error occurred while processing your query:";
pub const SETUP_ERROR_PREFIX: &str = "An error occurred during agent setup or tool listing:";
pub const RETRY_HINT: &str = "Please try again or type 'exit' to quit.";

const EXIT_TOKENS: [&str; 2] = ["exit", "stop"];

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInput,
    Dispatching,
    Displaying,
    ShuttingDown,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The user typed an exit token.
    UserExit,
    /// Standard input was closed.
    EndOfInput,
    /// Ctrl+C.
    Interrupted,
}

/// How a [`run_chat`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    /// The tool session never came up and no prompt was shown.
    SetupFailed,
    Finished(LoopExit),
}

/// How a single [`ask`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    SetupFailed,
    Answered,
    Failed,
    Interrupted,
}

/// A line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Exit,
    Empty,
    Query(String),
}

/// Trim and classify a raw input line. Exit tokens match case-insensitively.
pub fn classify_input(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Empty
    } else if EXIT_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        Input::Exit
    } else {
        Input::Query(trimmed.to_string())
    }
}

/// The store's tool server, as the session is opened against it.
#[derive(Debug, Clone)]
pub struct ToolServer {
    pub name: String,
    pub endpoint: Url,
    pub timeout: Duration,
}

/// Interactive channel bound to one tool host for its whole life.
pub struct CliChannel<'s, C: LlmClient> {
    executor: TurnExecutor<C>,
    tools: &'s dyn ToolHost,
    base_instructions: String,
    model: String,
    history: HistoryWindow,
    state: LoopState,
    show_progress: bool,
}

impl<'s, C: LlmClient> CliChannel<'s, C> {
    /// Create a new CLI channel.
    pub fn new(
        executor: TurnExecutor<C>,
        tools: &'s dyn ToolHost,
        base_instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            tools,
            base_instructions: base_instructions.into(),
            model: model.into(),
            history: HistoryWindow::new(),
            state: LoopState::AwaitingInput,
            show_progress: false,
        }
    }

    /// Show a spinner on stderr while turns are in flight.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run one query: build this turn's config, execute, and record the
    /// exchange if it succeeded.
    ///
    /// Dropping the future before it resolves records nothing.
    pub async fn run_once(&mut self, query: &str) -> std::result::Result<TurnResult, TurnError> {
        self.state = LoopState::Dispatching;
        let snapshot = self.history.snapshot();
        let agent = builder::build(&self.base_instructions, &snapshot, self.tools, &self.model);

        let outcome = self.executor.run(&agent, query).await;
        if let Ok(ref result) = outcome {
            self.history.record_exchange(query, result.final_text.as_str());
        }
        self.state = LoopState::AwaitingInput;
        outcome
    }

    /// Run the interactive loop until exit, end of input, or `shutdown`
    /// resolves.
    ///
    /// `shutdown` is raced against both the input read and the in-flight
    /// turn; a turn that loses the race is abandoned and not recorded.
    /// Lines that are not valid UTF-8 are reported and skipped.
    pub async fn run_interactive<R, W, S>(
        &mut self,
        input: R,
        out: &mut W,
        shutdown: S,
    ) -> Result<LoopExit>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut lines = input.split(b'\n');

        loop {
            self.state = LoopState::AwaitingInput;
            write!(out, "\n{PROMPT}")?;
            out.flush()?;

            let read = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                segment = lines.next_segment() => Some(segment),
            };
            let segment = match read {
                None => return self.interrupted(out),
                Some(segment) => segment?,
            };

            let Some(bytes) = segment else {
                writeln!(out)?;
                self.state = LoopState::ShuttingDown;
                return Ok(LoopExit::EndOfInput);
            };

            let line = match String::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    debug!("Skipping undecodable input: {}", e);
                    writeln!(out, "\n{ERROR_PREFIX} input is not valid UTF-8 ({e})")?;
                    writeln!(out, "{RETRY_HINT}")?;
                    continue;
                }
            };

            let query = match classify_input(&line) {
                Input::Exit => {
                    writeln!(out, "{GOODBYE}")?;
                    self.state = LoopState::ShuttingDown;
                    return Ok(LoopExit::UserExit);
                }
                Input::Empty => {
                    writeln!(out, "{EMPTY_HINT}")?;
                    continue;
                }
                Input::Query(query) => query,
            };

            debug!("Dispatching query: {}", query);
            let spinner = self.show_progress.then(ui::thinking_spinner);
            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                outcome = self.run_once(&query) => Some(outcome),
            };
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }

            match outcome {
                None => return self.interrupted(out),
                Some(Ok(result)) => {
                    self.state = LoopState::Displaying;
                    writeln!(out, "\n[AGENT RESPONSE]: {}", result.final_text)?;
                    writeln!(out, "\n{}", ui::separator())?;
                }
                Some(Err(e)) => {
                    writeln!(out, "\n{ERROR_PREFIX} {e}")?;
                    writeln!(out, "{RETRY_HINT}")?;
                }
            }
        }
    }

    fn interrupted<W: Write>(&mut self, out: &mut W) -> Result<LoopExit> {
        self.state = LoopState::ShuttingDown;
        writeln!(out, "\n\n{INTERRUPTED}")?;
        Ok(LoopExit::Interrupted)
    }
}

/// Open the tool session and discover its tools.
///
/// If discovery fails or `shutdown` resolves after the session was opened,
/// the session is closed before the error is returned.
pub async fn open_tool_session<S>(
    name: &str,
    endpoint: Url,
    timeout: Duration,
    shutdown: S,
) -> std::result::Result<McpSession, SetupError>
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let opened = tokio::select! {
        biased;
        _ = &mut shutdown => None,
        opened = McpSession::open(name, endpoint, timeout) => Some(opened),
    };
    let mut session = match opened {
        None => return Err(SetupError::Interrupted),
        Some(opened) => opened?,
    };

    let listed = tokio::select! {
        biased;
        _ = &mut shutdown => Err(SetupError::Interrupted),
        listed = session.list_tools() => listed.map(|_| ()),
    };
    match listed {
        Ok(()) => Ok(session),
        Err(e) => {
            session.close().await;
            Err(e)
        }
    }
}

/// Run the interactive loop over `session`, then close it.
///
/// The session is closed exactly once whichever way the loop ends,
/// including console I/O errors.
pub async fn run_with_session<C, R, W, S>(
    mut session: McpSession,
    executor: TurnExecutor<C>,
    base_instructions: &str,
    model: &str,
    show_progress: bool,
    input: R,
    out: &mut W,
    shutdown: S,
) -> Result<LoopExit>
where
    C: LlmClient,
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let outcome = {
        let mut channel = CliChannel::new(executor, &session, base_instructions, model)
            .with_progress(show_progress);
        channel.run_interactive(input, out, shutdown).await
    };

    session.close().await;
    if let Ok(exit) = outcome {
        info!("Chat loop ended: {:?}", exit);
    }
    outcome
}

fn write_ready_banner<W: Write>(out: &mut W, session: &McpSession) -> std::io::Result<()> {
    ui::write_success(
        out,
        &format!("MCP client '{}' connected to {}", session.name(), session.endpoint()),
    )?;
    ui::write_tools(out, session.tools())?;
    writeln!(out, "--------------------------------")?;
    writeln!(out, "{READY}")?;
    writeln!(out, "================================")
}

/// Open the tool session, then run the interactive loop over it.
///
/// A setup failure is reported on `out` and no prompt is ever shown.
/// `shutdown` covers setup as well as the loop.
pub async fn run_chat<C, R, W, S>(
    server: &ToolServer,
    executor: TurnExecutor<C>,
    base_instructions: &str,
    model: &str,
    show_progress: bool,
    input: R,
    out: &mut W,
    shutdown: S,
) -> Result<ChatOutcome>
where
    C: LlmClient,
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut session =
        match open_tool_session(&server.name, server.endpoint.clone(), server.timeout, &mut shutdown).await {
            Ok(session) => session,
            Err(SetupError::Interrupted) => {
                writeln!(out, "\n\n{INTERRUPTED}")?;
                return Ok(ChatOutcome::Finished(LoopExit::Interrupted));
            }
            Err(e) => {
                writeln!(out, "{SETUP_ERROR_PREFIX} {e}")?;
                return Ok(ChatOutcome::SetupFailed);
            }
        };

    if let Err(e) = write_ready_banner(out, &session) {
        session.close().await;
        return Err(e.into());
    }

    let exit = run_with_session(
        session,
        executor,
        base_instructions,
        model,
        show_progress,
        input,
        out,
        &mut shutdown,
    )
    .await?;
    Ok(ChatOutcome::Finished(exit))
}

/// Open the tool session, answer one query with no history, and close it.
pub async fn ask<C, W, S>(
    server: &ToolServer,
    executor: TurnExecutor<C>,
    base_instructions: &str,
    model: &str,
    query: &str,
    out: &mut W,
    shutdown: S,
) -> Result<AskOutcome>
where
    C: LlmClient,
    W: Write,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut session =
        match open_tool_session(&server.name, server.endpoint.clone(), server.timeout, &mut shutdown).await {
            Ok(session) => session,
            Err(SetupError::Interrupted) => {
                writeln!(out, "\n\n{INTERRUPTED}")?;
                return Ok(AskOutcome::Interrupted);
            }
            Err(e) => {
                writeln!(out, "{SETUP_ERROR_PREFIX} {e}")?;
                return Ok(AskOutcome::SetupFailed);
            }
        };

    let outcome = {
        let agent = builder::build(base_instructions, &[], &session, model);
        tokio::select! {
            biased;
            _ = &mut shutdown => None,
            outcome = executor.run(&agent, query) => Some(outcome),
        }
    };
    session.close().await;

    match outcome {
        None => {
            writeln!(out, "\n\n{INTERRUPTED}")?;
            Ok(AskOutcome::Interrupted)
        }
        Some(Ok(result)) => {
            writeln!(out, "\n[AGENT RESPONSE]: {}", result.final_text)?;
            Ok(AskOutcome::Answered)
        }
        Some(Err(e)) => {
            writeln!(out, "\n{ERROR_PREFIX} {e}")?;
            Ok(AskOutcome::Failed)
        }
    }
}
