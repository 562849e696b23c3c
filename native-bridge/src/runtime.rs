//! Runtime setup and owner-thread management.
//!
//! The runtime holds the installed native backend, the bridge configuration
//! and the id of the owner thread: the thread that pumps events and performs
//! window-owning operations. Work that must happen on that thread can be sent
//! to it from anywhere with [`run_on_owner_thread`]; it runs during the next
//! [`crate::pump_events`].

use std::any::Any;
use std::sync::Arc;
use std::thread::ThreadId;

use async_channel::{Receiver, Sender};
use spin::RwLock;

use crate::error::{Error, Result};
use crate::native::NativeBackend;
use crate::trampoline;

/// A task to be executed on the owner thread with completion signaling and
/// return value.
pub struct OwnerTask {
    task: Box<dyn FnOnce() -> Box<dyn Any + Send + 'static> + Send + 'static>,
    completion: Option<Sender<Box<dyn Any + Send + 'static>>>,
}

impl OwnerTask {
    fn new(
        task: Box<dyn FnOnce() -> Box<dyn Any + Send + 'static> + Send + 'static>,
        completion: Sender<Box<dyn Any + Send + 'static>>,
    ) -> Self {
        Self {
            task,
            completion: Some(completion),
        }
    }

    /// Execute the task and signal completion with the return value.
    fn execute(mut self) {
        let result = (self.task)();
        if let Some(sender) = self.completion.take() {
            let _ = sender.try_send(result);
        }
    }
}

impl std::fmt::Debug for OwnerTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerTask")
            .field("task", &"<closure>")
            .finish()
    }
}

/// Bridge configuration, assembled with [`BridgeBuilder`].
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Forward native log output to `tracing` on install.
    pub forward_native_log: bool,
    /// Emit a trace line for every event that matched no live object.
    pub trace_unrouted_events: bool,
    /// Thread allowed to pump events; defaults to the installing thread.
    pub owner_thread: Option<ThreadId>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            forward_native_log: true,
            trace_unrouted_events: false,
            owner_thread: None,
        }
    }
}

/// The installed bridge: backend, configuration and owner-thread task queue.
pub struct Runtime {
    backend: Arc<dyn NativeBackend>,
    config: BridgeConfig,
    owner_thread: ThreadId,
    task_sender: Sender<OwnerTask>,
    task_receiver: Receiver<OwnerTask>,
}

impl Runtime {
    pub fn backend(&self) -> &Arc<dyn NativeBackend> {
        &self.backend
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn owner_thread(&self) -> ThreadId {
        self.owner_thread
    }

    /// Run every task queued for the owner thread. Returns how many ran.
    pub(crate) fn run_owner_tasks(&self) -> usize {
        if std::thread::current().id() != self.owner_thread {
            return 0;
        }
        let mut ran = 0;
        while let Ok(task) = self.task_receiver.try_recv() {
            task.execute();
            ran += 1;
        }
        ran
    }
}

static RUNTIME: RwLock<Option<Arc<Runtime>>> = RwLock::new(None);

/// Builder for installing the bridge runtime.
///
/// # Example
///
/// ```ignore
/// use native_bridge::BridgeBuilder;
///
/// let runtime = BridgeBuilder::new()
///     .forward_native_log(false)
///     .install(backend)?;
/// ```
#[derive(Default)]
pub struct BridgeBuilder {
    config: BridgeConfig,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward_native_log(mut self, forward: bool) -> Self {
        self.config.forward_native_log = forward;
        self
    }

    pub fn trace_unrouted_events(mut self, trace: bool) -> Self {
        self.config.trace_unrouted_events = trace;
        self
    }

    pub fn owner_thread(mut self, thread: ThreadId) -> Self {
        self.config.owner_thread = Some(thread);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Install the runtime with the given native backend.
    pub fn install(self, backend: Arc<dyn NativeBackend>) -> Result<Arc<Runtime>> {
        let mut slot = RUNTIME.write();
        if slot.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let (task_sender, task_receiver) = async_channel::unbounded();
        let owner_thread = self
            .config
            .owner_thread
            .unwrap_or_else(|| std::thread::current().id());
        let runtime = Arc::new(Runtime {
            backend,
            config: self.config,
            owner_thread,
            task_sender,
            task_receiver,
        });
        *slot = Some(runtime.clone());
        drop(slot);

        if runtime.config.forward_native_log {
            trampoline::log::forward_to_tracing(&*runtime.backend);
        }
        tracing::debug!(owner_thread = ?owner_thread, "bridge runtime installed");
        Ok(runtime)
    }
}

/// Install the runtime with the default configuration.
pub fn init(backend: Arc<dyn NativeBackend>) -> Result<Arc<Runtime>> {
    BridgeBuilder::new().install(backend)
}

/// Uninstall the runtime.
///
/// Wrappers that are still alive keep their backend and can still be
/// disposed; new objects can no longer be opened. Queued owner-thread tasks
/// are dropped, which fails their waiting callers.
pub fn shutdown() -> Result<()> {
    let runtime = RUNTIME.write().take().ok_or(Error::NotInitialized)?;
    trampoline::log::clear_log_handler(&*runtime.backend);
    runtime.task_receiver.close();
    while let Ok(task) = runtime.task_receiver.try_recv() {
        drop(task);
    }
    crate::events::reset();
    crate::objects::report_live();
    tracing::debug!("bridge runtime shut down");
    Ok(())
}

pub fn get_runtime() -> Result<Arc<Runtime>> {
    RUNTIME.read().clone().ok_or(Error::NotInitialized)
}

pub fn is_initialized() -> bool {
    RUNTIME.read().is_some()
}

pub(crate) fn backend() -> Result<Arc<dyn NativeBackend>> {
    Ok(get_runtime()?.backend.clone())
}

/// The backend, for an open primitive.
///
/// On the owner thread, routes retired elsewhere are settled first: the open
/// may hand out an id whose previous owner still has events queued.
pub(crate) fn backend_for_open() -> Result<Arc<dyn NativeBackend>> {
    let runtime = get_runtime()?;
    if runtime.owner_thread == std::thread::current().id() {
        crate::events::settle_retired_routes(&*runtime.backend);
    }
    Ok(runtime.backend.clone())
}

/// Check if the current thread is the owner thread.
pub fn is_owner_thread() -> bool {
    get_runtime().is_ok_and(|runtime| runtime.owner_thread == std::thread::current().id())
}

/// Execute a closure on the owner thread and block until it completes,
/// returning the closure's result.
///
/// From the owner thread the closure runs immediately. From any other thread
/// it is queued and runs during the owner thread's next
/// [`crate::pump_events`]; the caller blocks until then.
pub fn run_on_owner_thread<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let runtime = get_runtime()?;
    if runtime.owner_thread == std::thread::current().id() {
        return Ok(f());
    }

    let (tx, rx) = async_channel::bounded::<Box<dyn Any + Send + 'static>>(1);
    let task = OwnerTask::new(
        Box::new(move || Box::new(f()) as Box<dyn Any + Send + 'static>),
        tx,
    );
    runtime
        .task_sender
        .try_send(task)
        .map_err(|_| owner_gone())?;
    drop(runtime);

    let result = pollster::block_on(rx.recv()).map_err(|_| owner_gone())?;
    result.downcast::<T>().map(|value| *value).map_err(|_| Error::Native {
        operation: "run_on_owner_thread",
        message: "owner task returned an unexpected type".to_string(),
    })
}

fn owner_gone() -> Error {
    Error::Native {
        operation: "run_on_owner_thread",
        message: "the runtime shut down before the task ran".to_string(),
    }
}
