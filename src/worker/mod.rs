// src/worker/mod.rs

//! Workers: the payload of a work node.
//!
//! - [`Task`]: a leaf that does real work, possibly on a pool thread.
//! - [`Dispatcher`]: a branch that declares [`Blueprint`]s and builds child
//!   nodes from them on the orchestrating thread.
//!
//! Both are prepared (parameters declared, blueprints listed) exactly once
//! before they execute.

pub mod blueprint;
pub mod context;
pub mod dispatcher;
pub mod module;
pub mod sample_root;
pub mod task;

use std::any::Any;
use std::fmt;

pub use blueprint::{Blueprint, BlueprintList, Builder, Built};
pub use context::{RunContext, TaskContext};
pub use dispatcher::{Dispatcher, DispatcherWorker};
pub use module::ModuleInterface;
pub use sample_root::{SIMULATED_SAMPLE, SampleRoot};
pub use task::{Task, TaskWorker, WorkOutcome};

/// Type-erased access to a concrete worker, used by typed blueprint
/// instantiation.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Task,
    Dispatcher,
}

/// The worker instance owned by a node.
pub enum Worker {
    Task(TaskWorker),
    Dispatcher(DispatcherWorker),
}

impl Worker {
    pub fn task(task: impl Task) -> Self {
        Worker::Task(TaskWorker::new(Box::new(task)))
    }

    pub fn dispatcher(dispatcher: impl Dispatcher) -> Self {
        Worker::Dispatcher(DispatcherWorker::new(Box::new(dispatcher)))
    }

    pub fn kind(&self) -> WorkerKind {
        match self {
            Worker::Task(_) => WorkerKind::Task,
            Worker::Dispatcher(_) => WorkerKind::Dispatcher,
        }
    }

    pub fn is_sample_root(&self) -> bool {
        match self {
            Worker::Task(_) => false,
            Worker::Dispatcher(d) => d.dispatcher().is_sample_root(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Worker::Task(t) => AsAny::as_any(t.task()).downcast_ref(),
            Worker::Dispatcher(d) => AsAny::as_any(d.dispatcher()).downcast_ref(),
        }
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        match self {
            Worker::Task(t) => AsAny::as_any_mut(t.task_mut()).downcast_mut(),
            Worker::Dispatcher(d) => AsAny::as_any_mut(d.dispatcher_mut()).downcast_mut(),
        }
    }

    fn inner_type_name(&self) -> &'static str {
        match self {
            Worker::Task(t) => AsAny::type_name(t.task()),
            Worker::Dispatcher(d) => AsAny::type_name(d.dispatcher()),
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("kind", &self.kind())
            .field("type", &self.inner_type_name())
            .finish()
    }
}
