//! Async Tasks
//!
//! A [`Task`] is a controller that runs an async function when its host
//! updates and its arguments changed, and requests host updates so the
//! component can render the task's status.
//!
//! ```rust,ignore
//! let task = Task::new(host, TaskConfig::new(|args, _signal| async move {
//!     fetch(args[0].to_text()).await
//! })
//! .args({
//!     let host = host.downgrade();
//!     move || host.upgrade().map(|h| vec![h.get("url")]).unwrap_or_default()
//! }));
//!
//! // in render
//! task.render(&TaskRenderer {
//!     pending: Some(&|| html!("<p>Loading</p>").into()),
//!     complete: Some(&|value| html!("<p>{}</p>", value.clone()).into()),
//!     ..Default::default()
//! })
//! ```
//!
//! Only the latest run settles the task: a run started while another is
//! pending aborts the earlier one's [`AbortSignal`], and the earlier result
//! is ignored when it arrives.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures_util::future::{FutureExt, LocalBoxFuture};
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::value::Value;

use super::controller::{ReactiveController, ReactiveControllerHost};
use super::host::{Host, WeakHost};

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Initial,
    Pending,
    Complete,
    Error,
}

/// When a task checks its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRun {
    /// Only explicit [`Task::run`] calls.
    Off,
    /// During the host update, before render.
    #[default]
    OnUpdate,
    /// After the host update.
    AfterUpdate,
}

struct InitialState;

/// A task result that returns the task to [`TaskStatus::Initial`].
pub fn initial_state() -> Value {
    Value::object(InitialState)
}

struct AbortState {
    aborted: Cell<bool>,
    notify: Notify,
}

/// Tells a running task function that its run was superseded or aborted.
#[derive(Clone)]
pub struct AbortSignal {
    state: Rc<AbortState>,
}

impl AbortSignal {
    fn new() -> Self {
        Self {
            state: Rc::new(AbortState {
                aborted: Cell::new(false),
                notify: Notify::new(),
            }),
        }
    }

    fn abort(&self) {
        self.state.aborted.set(true);
        self.state.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.state.aborted.get()
    }

    /// Resolves once the run is aborted.
    pub async fn aborted(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

type TaskFn = Box<dyn Fn(Vec<Value>, AbortSignal) -> LocalBoxFuture<'static, Result<Value>>>;
type ArgsFn = Box<dyn Fn() -> Vec<Value>>;
type ArgsEqual = Box<dyn Fn(&[Value], &[Value]) -> bool>;

/// Configuration of a [`Task`].
pub struct TaskConfig {
    task: TaskFn,
    args: Option<ArgsFn>,
    args_equal: ArgsEqual,
    on_complete: Option<Box<dyn Fn(&Value) -> Result<()>>>,
    on_error: Option<Box<dyn Fn(&Error) -> Result<()>>>,
    auto_run: AutoRun,
    initial_value: Option<Value>,
}

impl TaskConfig {
    pub fn new<F, Fut>(task: F) -> Self
    where
        F: Fn(Vec<Value>, AbortSignal) -> Fut + 'static,
        Fut: Future<Output = Result<Value>> + 'static,
    {
        Self {
            task: Box::new(move |args, signal| task(args, signal).boxed_local()),
            args: None,
            args_equal: Box::new(shallow_equals),
            on_complete: None,
            on_error: None,
            auto_run: AutoRun::OnUpdate,
            initial_value: None,
        }
    }

    /// The arguments, read on every host update. Without an args function
    /// the task never runs automatically.
    pub fn args(mut self, args: impl Fn() -> Vec<Value> + 'static) -> Self {
        self.args = Some(Box::new(args));
        self
    }

    pub fn args_equal(mut self, equal: impl Fn(&[Value], &[Value]) -> bool + 'static) -> Self {
        self.args_equal = Box::new(equal);
        self
    }

    /// Called with each completed value. Errors are logged and dropped.
    pub fn on_complete(mut self, callback: impl Fn(&Value) -> Result<()> + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Called with each task error. Errors are logged and dropped.
    pub fn on_error(mut self, callback: impl Fn(&Error) -> Result<()> + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn auto_run(mut self, auto_run: AutoRun) -> Self {
        self.auto_run = auto_run;
        self
    }

    /// Start complete with `value`; the task runs once the arguments change.
    pub fn initial_value(mut self, value: Value) -> Self {
        self.initial_value = Some(value);
        self
    }
}

/// Element-wise [`Value::same`].
pub fn shallow_equals(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}

struct TaskState {
    status: TaskStatus,
    value: Option<Value>,
    error: Option<Error>,
    previous_args: Option<Vec<Value>>,
    call_id: u64,
    signal: Option<AbortSignal>,
}

/// Renderers for each status, used by [`Task::render`].
#[derive(Default)]
pub struct TaskRenderer<'a> {
    pub initial: Option<&'a dyn Fn() -> Value>,
    pub pending: Option<&'a dyn Fn() -> Value>,
    pub complete: Option<&'a dyn Fn(&Value) -> Value>,
    pub error: Option<&'a dyn Fn(&Error) -> Value>,
}

/// A controller running an async function for its host.
pub struct Task {
    this: Weak<Task>,
    host: WeakHost,
    config: TaskConfig,
    state: RefCell<TaskState>,
    settled: Notify,
}

impl Task {
    /// Create a task and add it to `host`.
    pub fn new(host: &Host, config: TaskConfig) -> Rc<Task> {
        let (status, value, previous_args) = match &config.initial_value {
            Some(value) => (
                TaskStatus::Complete,
                Some(value.clone()),
                config.args.as_ref().map(|args| args()),
            ),
            None => (TaskStatus::Initial, None, None),
        };
        let task = Rc::new_cyclic(|this| Task {
            this: this.clone(),
            host: host.downgrade(),
            config,
            state: RefCell::new(TaskState {
                status,
                value,
                error: None,
                previous_args,
                call_id: 0,
                signal: None,
            }),
            settled: Notify::new(),
        });
        host.add_controller(task.clone());
        task
    }

    pub fn status(&self) -> TaskStatus {
        self.state.borrow().status
    }

    /// The value of the last completed run.
    pub fn value(&self) -> Option<Value> {
        self.state.borrow().value.clone()
    }

    /// The error of the last failed run.
    pub fn error(&self) -> Option<Error> {
        self.state.borrow().error.clone()
    }

    /// Start a run with `args`, or with the args function's arguments.
    ///
    /// The task is pending as soon as this returns; the returned future
    /// drives the run to completion.
    pub fn run(&self, args: Option<Vec<Value>>) -> impl Future<Output = ()> + 'static {
        let args = args.or_else(|| self.config.args.as_ref().map(|args| args()));
        let signal = AbortSignal::new();
        let key = {
            let mut state = self.state.borrow_mut();
            state.previous_args = args.clone();
            if state.status == TaskStatus::Pending {
                if let Some(previous) = &state.signal {
                    previous.abort();
                }
            }
            state.status = TaskStatus::Pending;
            state.call_id += 1;
            state.signal = Some(signal.clone());
            state.call_id
        };
        self.request_host_update();

        let pending = (self.config.task)(args.unwrap_or_default(), signal);
        let this = self.this.clone();
        async move {
            let result = pending.await;
            if let Some(task) = this.upgrade() {
                task.settle(key, result);
            }
        }
    }

    /// Abort the pending run. Does nothing unless pending.
    pub fn abort(&self) {
        let state = self.state.borrow();
        if state.status == TaskStatus::Pending {
            if let Some(signal) = &state.signal {
                signal.abort();
            }
        }
    }

    /// Resolves with the outcome of the current run, or immediately when
    /// no run is pending.
    pub async fn task_complete(&self) -> Result<Value> {
        loop {
            let settled = self.settled.notified();
            {
                let state = self.state.borrow();
                match state.status {
                    TaskStatus::Pending => {}
                    TaskStatus::Error => {
                        if let Some(error) = &state.error {
                            return Err(error.clone());
                        }
                        return Ok(Value::Null);
                    }
                    TaskStatus::Initial | TaskStatus::Complete => {
                        return Ok(state.value.clone().unwrap_or_default());
                    }
                }
            }
            settled.await;
        }
    }

    /// Render with the renderer for the current status. Missing renderers
    /// render nothing.
    pub fn render(&self, renderer: &TaskRenderer<'_>) -> Value {
        let (status, value, error) = {
            let state = self.state.borrow();
            (state.status, state.value.clone(), state.error.clone())
        };
        let rendered = match status {
            TaskStatus::Initial => renderer.initial.map(|render| render()),
            TaskStatus::Pending => renderer.pending.map(|render| render()),
            TaskStatus::Complete => renderer
                .complete
                .map(|render| render(&value.unwrap_or_default())),
            TaskStatus::Error => match (renderer.error, error) {
                (Some(render), Some(error)) => Some(render(&error)),
                _ => None,
            },
        };
        rendered.unwrap_or(Value::Nothing)
    }

    fn settle(&self, key: u64, result: Result<Value>) {
        if self.state.borrow().call_id != key {
            return;
        }
        match result {
            Ok(value) if value.downcast::<InitialState>().is_some() => {
                self.state.borrow_mut().status = TaskStatus::Initial;
            }
            Ok(value) => {
                if let Some(callback) = &self.config.on_complete {
                    if let Err(err) = callback(&value) {
                        tracing::debug!(%err, "task completion callback failed");
                    }
                }
                let mut state = self.state.borrow_mut();
                state.status = TaskStatus::Complete;
                state.value = Some(value);
                state.error = None;
            }
            Err(error) => {
                if let Some(callback) = &self.config.on_error {
                    if let Err(err) = callback(&error) {
                        tracing::debug!(%err, "task error callback failed");
                    }
                }
                let mut state = self.state.borrow_mut();
                state.status = TaskStatus::Error;
                state.value = None;
                state.error = Some(error);
            }
        }
        self.settled.notify_waiters();
        self.request_host_update();
    }

    /// Run when the arguments changed since the last run.
    fn perform(&self) {
        let Some(args) = self.config.args.as_ref().map(|args| args()) else {
            return;
        };
        let previous = self.state.borrow_mut().previous_args.replace(args.clone());
        let changed = match previous {
            Some(previous) => !(self.config.args_equal)(&previous, &args),
            None => true,
        };
        if changed {
            tokio::task::spawn_local(self.run(Some(args)));
        }
    }

    fn request_host_update(&self) {
        if let Some(host) = self.host.upgrade() {
            host.request_update();
        }
    }
}

impl ReactiveController for Task {
    fn host_update(&self) {
        if self.config.auto_run == AutoRun::OnUpdate {
            self.perform();
        }
    }

    fn host_updated(&self) {
        if self.config.auto_run == AutoRun::AfterUpdate {
            self.perform();
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Task")
            .field("status", &state.status)
            .field("call_id", &state.call_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_equality_uses_value_identity() {
        let a = [Value::Number(1.0), Value::str("x")];
        assert!(shallow_equals(&a, &[Value::Number(1.0), Value::str("x")]));
        assert!(!shallow_equals(&a, &[Value::Number(1.0)]));
        let json = Value::from(serde_json::json!({"k": 1}));
        assert!(!shallow_equals(
            &[json],
            &[Value::from(serde_json::json!({"k": 1}))]
        ));
    }

    #[tokio::test]
    async fn abort_signal_wakes_waiters() {
        let signal = AbortSignal::new();
        let waiter = signal.clone();
        assert!(!waiter.is_aborted());
        signal.abort();
        waiter.aborted().await;
        assert!(waiter.is_aborted());
    }
}
