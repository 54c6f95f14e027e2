//! Single-writer store behind the todo list screen.
//!
//! # Design
//! One actor task owns the `Snapshot`. The UI talks to it through a cloneable
//! `TodoStore` handle and observes it through a `watch` channel of
//! `ListState`. Every backing-store call runs in its own task; when it
//! completes, its result comes back to the actor as a message and is applied
//! in arrival order, so the snapshot has exactly one writer and needs no lock.
//!
//! Failed calls do not retry by themselves. The task parks on a oneshot
//! channel, the actor publishes the failure as a `PendingFailure` with a
//! ticket, and `TodoStore::resolve` answers it with a `RetryDecision`.
//!
//! # Invariants
//! - Fetch phase: `Idle -> Loading -> {Loaded, Failed}`; `Failed -> Loading`
//!   on retry; a dismissed fetch stays `Failed`. Only the most recently
//!   issued fetch moves the phase.
//! - A failed or dismissed operation leaves the snapshot untouched.
//! - `last_error` holds until the next successful operation or
//!   `TodoStore::acknowledge_error`.
//! - Mutations are not serialized against each other. Updates carry the
//!   target's revision from dispatch time and conflicts are settled by the
//!   store's `ConflictPolicy`.
//! - When every handle is dropped the actor stops. Calls already in flight
//!   are not cancelled; their results are discarded.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot, watch};

use crate::bucket::{self, DateBucket, Grouping, Section};
use crate::clock::Clock;
use crate::error::TodoError;
use crate::form::{FormMode, WriteRequest};
use crate::retry::{run_with_retry, RetryDecision, RetryPrompt};
use crate::service::TodoService;
use crate::snapshot::{Applied, ConflictPolicy, Snapshot};
use crate::types::Todo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// The logical operation a backing-store call belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Add { title: String },
    Edit { id: String },
    ToggleDone { id: String },
    Delete { id: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Fetch => write!(f, "fetch"),
            Operation::Add { title } => write!(f, "add `{title}`"),
            Operation::Edit { id } => write!(f, "edit {id}"),
            Operation::ToggleDone { id } => write!(f, "toggle {id}"),
            Operation::Delete { id } => write!(f, "delete {id}"),
        }
    }
}

/// A failure waiting for the user to choose retry or dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFailure {
    pub ticket: u64,
    pub operation: Operation,
    pub error: TodoError,
}

/// Everything the list screen renders.
#[derive(Debug, Clone, Default)]
pub struct ListState {
    pub phase: LoadPhase,
    pub filter: DateBucket,
    pub snapshot: Snapshot,
    /// `snapshot` split by date bucket, rebuilt on every publish.
    pub groups: Grouping,
    pub pending: Vec<PendingFailure>,
    /// Final error of the most recent operation that was dismissed or could
    /// not be reconciled. Cleared by the next success or an acknowledgement.
    pub last_error: Option<TodoError>,
    /// Backing-store calls started but not finished (including parked ones).
    pub in_flight: usize,
}

impl ListState {
    /// Todos in the selected tab.
    pub fn visible(&self) -> &[Todo] {
        self.groups.get(self.filter)
    }

    /// Visible todos under per-day headers.
    pub fn sections(&self, clock: &dyn Clock) -> Vec<Section> {
        bucket::sections(self.visible(), clock)
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    /// The error the screen should show: the oldest unanswered failure first.
    pub fn error(&self) -> Option<&TodoError> {
        self.pending
            .first()
            .map(|pending| &pending.error)
            .or(self.last_error.as_ref())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub filter: DateBucket,
    pub conflict_policy: ConflictPolicy,
}

/// Handle to the list store actor.
#[derive(Clone)]
pub struct TodoStore {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ListState>,
}

impl TodoStore {
    /// Starts the actor with default options. Must be called from within a
    /// Tokio runtime.
    pub fn spawn(service: TodoService, clock: Arc<dyn Clock>) -> Self {
        Self::spawn_with(service, clock, StoreOptions::default())
    }

    pub fn spawn_with(service: TodoService, clock: Arc<dyn Clock>, options: StoreOptions) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let initial = ListState {
            filter: options.filter,
            ..ListState::default()
        };
        let (publisher, state) = watch::channel(initial.clone());

        let actor = Actor {
            service,
            clock,
            policy: options.conflict_policy,
            state: initial,
            publisher,
            reports: reports_tx,
            replies: HashMap::new(),
            next_ticket: 1,
            next_call: 1,
            latest_fetch: 0,
        };
        tokio::spawn(actor.run(commands_rx, reports_rx));

        Self {
            commands: commands_tx,
            state,
        }
    }

    /// Reloads the whole list from the backing store.
    pub fn fetch(&self) -> Result<(), TodoError> {
        self.send(Command::Fetch)
    }

    /// Creates or edits a todo from a submitted form.
    pub fn submit(&self, request: WriteRequest) -> Result<(), TodoError> {
        self.send(Command::Write(request))
    }

    pub fn toggle_done(&self, todo: Todo) -> Result<(), TodoError> {
        self.send(Command::ToggleDone(todo))
    }

    pub fn delete(&self, id: impl Into<String>) -> Result<(), TodoError> {
        self.send(Command::Delete(id.into()))
    }

    pub fn select_filter(&self, filter: DateBucket) -> Result<(), TodoError> {
        self.send(Command::SelectFilter(filter))
    }

    /// Answers the pending failure identified by `ticket`.
    pub fn resolve(&self, ticket: u64, decision: RetryDecision) -> Result<(), TodoError> {
        self.send(Command::Resolve { ticket, decision })
    }

    /// Clears `last_error` once the screen has shown it.
    pub fn acknowledge_error(&self) -> Result<(), TodoError> {
        self.send(Command::AcknowledgeError)
    }

    /// Latest published state.
    pub fn state(&self) -> ListState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.clone()
    }

    /// Waits until the published state satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ListState) -> bool,
    ) -> Result<ListState, TodoError> {
        let mut state = self.state.clone();
        let matched = state
            .wait_for(predicate)
            .await
            .map_err(|_| TodoError::Closed)?;
        Ok(ListState::clone(&matched))
    }

    fn send(&self, command: Command) -> Result<(), TodoError> {
        self.commands.send(command).map_err(|_| TodoError::Closed)
    }
}

enum Command {
    Fetch,
    Write(WriteRequest),
    ToggleDone(Todo),
    Delete(String),
    SelectFilter(DateBucket),
    AcknowledgeError,
    Resolve { ticket: u64, decision: RetryDecision },
}

/// Reports carry the id `spawn_call` gave the backing-store call.
enum Report {
    AwaitingDecision {
        call: u64,
        operation: Operation,
        error: TodoError,
        reply: oneshot::Sender<RetryDecision>,
    },
    Finished {
        call: u64,
        operation: Operation,
        outcome: Outcome,
    },
}

enum Outcome {
    Fetched(Vec<Todo>),
    Added(Todo),
    Updated { todo: Todo, base: Option<u64> },
    Deleted(String),
    Abandoned(TodoError),
}

struct Actor {
    service: TodoService,
    clock: Arc<dyn Clock>,
    policy: ConflictPolicy,
    state: ListState,
    publisher: watch::Sender<ListState>,
    reports: mpsc::UnboundedSender<Report>,
    replies: HashMap<u64, Parked>,
    next_ticket: u64,
    next_call: u64,
    /// Call id of the most recently issued fetch.
    latest_fetch: u64,
}

struct Parked {
    call: u64,
    reply: oneshot::Sender<RetryDecision>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut reports: mpsc::UnboundedReceiver<Report>,
    ) {
        info!("event=store_start module=store status=ok");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(report) = reports.recv() => self.handle_report(report),
            }
            self.publish();
        }
        info!(
            "event=store_stop module=store status=ok abandoned={}",
            self.state.in_flight
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Fetch => {
                self.state.phase = LoadPhase::Loading;
                let service = self.service.clone();
                self.latest_fetch = self.spawn_call(
                    Operation::Fetch,
                    move || {
                        let service = service.clone();
                        async move { service.fetch().await }
                    },
                    Outcome::Fetched,
                );
            }
            Command::Write(request) => {
                let (operation, base) = match &request.mode {
                    FormMode::Create => (
                        Operation::Add {
                            title: request.title.clone(),
                        },
                        None,
                    ),
                    FormMode::Edit(existing) => (
                        Operation::Edit {
                            id: existing.id.clone(),
                        },
                        self.state.snapshot.revision_of(&existing.id),
                    ),
                };
                let is_create = request.mode == FormMode::Create;
                let service = self.service.clone();
                self.spawn_call(
                    operation,
                    move || {
                        let service = service.clone();
                        let request = request.clone();
                        async move { service.write(&request).await }
                    },
                    move |todo| {
                        if is_create {
                            Outcome::Added(todo)
                        } else {
                            Outcome::Updated { todo, base }
                        }
                    },
                );
            }
            Command::ToggleDone(target) => {
                let base = self.state.snapshot.revision_of(&target.id);
                let operation = Operation::ToggleDone {
                    id: target.id.clone(),
                };
                let service = self.service.clone();
                self.spawn_call(
                    operation,
                    move || {
                        let service = service.clone();
                        let target = target.clone();
                        async move { service.toggle_done(&target).await }
                    },
                    move |todo| Outcome::Updated { todo, base },
                );
            }
            Command::Delete(id) => {
                let operation = Operation::Delete { id: id.clone() };
                let service = self.service.clone();
                self.spawn_call(
                    operation,
                    move || {
                        let service = service.clone();
                        let id = id.clone();
                        async move { service.delete(&id).await }
                    },
                    Outcome::Deleted,
                );
            }
            Command::SelectFilter(filter) => {
                self.state.filter = filter;
            }
            Command::AcknowledgeError => {
                self.state.last_error = None;
            }
            Command::Resolve { ticket, decision } => self.resolve(ticket, decision),
        }
    }

    fn handle_report(&mut self, report: Report) {
        match report {
            Report::AwaitingDecision {
                call,
                operation,
                error,
                reply,
            } => {
                let ticket = self.next_ticket;
                self.next_ticket += 1;
                warn!(
                    "event=operation_failed module=store status=awaiting_decision ticket={ticket} operation={operation} error={error}"
                );
                if call == self.latest_fetch {
                    self.state.phase = LoadPhase::Failed;
                }
                self.replies.insert(ticket, Parked { call, reply });
                self.state.pending.push(PendingFailure {
                    ticket,
                    operation,
                    error,
                });
            }
            Report::Finished {
                call,
                operation,
                outcome,
            } => {
                self.state.in_flight = self.state.in_flight.saturating_sub(1);
                self.apply(call, operation, outcome);
            }
        }
    }

    fn resolve(&mut self, ticket: u64, decision: RetryDecision) {
        let Some(Parked { call, reply }) = self.replies.remove(&ticket) else {
            warn!("event=retry_resolve module=store status=unknown_ticket ticket={ticket}");
            return;
        };
        let position = self
            .state
            .pending
            .iter()
            .position(|pending| pending.ticket == ticket);
        if let Some(pending) = position.map(|index| self.state.pending.remove(index)) {
            debug!(
                "event=retry_resolve module=store status=ok ticket={ticket} operation={} decision={decision:?}",
                pending.operation
            );
            if call == self.latest_fetch && decision == RetryDecision::Retry {
                self.state.phase = LoadPhase::Loading;
            }
        }
        // The task may have been dropped with the runtime; nothing to do then.
        let _ = reply.send(decision);
    }

    fn apply(&mut self, call: u64, operation: Operation, outcome: Outcome) {
        let latest_fetch = call == self.latest_fetch;
        match outcome {
            Outcome::Fetched(todos) => {
                self.state.snapshot.replace_all(todos);
                if latest_fetch {
                    self.state.phase = LoadPhase::Loaded;
                }
                self.state.last_error = None;
            }
            Outcome::Added(todo) => {
                self.state.snapshot.push(todo);
                self.state.last_error = None;
            }
            Outcome::Updated { todo, base } => {
                let id = todo.id.clone();
                match self.state.snapshot.apply_update(todo, base, self.policy) {
                    Ok(Applied::Clean) => self.state.last_error = None,
                    Ok(Applied::Superseded) => {
                        warn!(
                            "event=snapshot_conflict module=store status=superseded operation={operation} id={id}"
                        );
                        self.state.last_error = None;
                    }
                    Err(error) => {
                        warn!(
                            "event=snapshot_apply module=store status=error operation={operation} error={error}"
                        );
                        self.state.last_error = Some(error);
                    }
                }
            }
            Outcome::Deleted(id) => {
                let removed = self.state.snapshot.remove(&id);
                debug!("event=snapshot_delete module=store status=ok id={id} removed={removed}");
                self.state.last_error = None;
            }
            Outcome::Abandoned(error) => {
                info!(
                    "event=operation_dismissed module=store status=error operation={operation} error={error}"
                );
                if latest_fetch {
                    self.state.phase = LoadPhase::Failed;
                }
                self.state.last_error = Some(error);
            }
        }
    }

    /// Runs `task` on its own task under the retry loop and reports the
    /// outcome back to the actor. Returns the id its reports carry.
    fn spawn_call<T, F, Fut>(
        &mut self,
        operation: Operation,
        task: F,
        finish: impl FnOnce(T) -> Outcome + Send + 'static,
    ) -> u64
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TodoError>> + Send + 'static,
    {
        let call = self.next_call;
        self.next_call += 1;
        self.state.in_flight += 1;
        debug!("event=operation_start module=store status=start call={call} operation={operation}");
        let reports = self.reports.clone();
        tokio::spawn(async move {
            let mut prompt = StorePrompt {
                call,
                reports: reports.clone(),
                operation: operation.clone(),
            };
            let outcome = match run_with_retry(task, &mut prompt).await {
                Ok(value) => finish(value),
                Err(error) => Outcome::Abandoned(error),
            };
            // The actor is gone if this fails; the result is discarded.
            let _ = reports.send(Report::Finished {
                call,
                operation,
                outcome,
            });
        });
        call
    }

    fn publish(&mut self) {
        self.state.groups = Grouping::build(self.state.snapshot.iter(), self.clock.as_ref());
        self.publisher.send_replace(self.state.clone());
    }
}

/// Forwards failures to the actor and waits for the user's answer.
struct StorePrompt {
    call: u64,
    reports: mpsc::UnboundedSender<Report>,
    operation: Operation,
}

#[async_trait]
impl RetryPrompt for StorePrompt {
    async fn decide(&mut self, error: &TodoError) -> RetryDecision {
        let (reply, decision) = oneshot::channel();
        let report = Report::AwaitingDecision {
            call: self.call,
            operation: self.operation.clone(),
            error: error.clone(),
            reply,
        };
        if self.reports.send(report).is_err() {
            return RetryDecision::Dismiss;
        }
        decision.await.unwrap_or(RetryDecision::Dismiss)
    }
}
