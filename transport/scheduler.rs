// Cooperative single-threaded task queue ("next tick" execution)
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::trace;

pub type Task = Box<dyn FnOnce()>;

/// Somewhere to put work that must run after the current call returns.
///
/// Implementations run deferred tasks in FIFO order and never run a task
/// inside the `defer` call that scheduled it.
pub trait Scheduler {
    fn defer(&self, task: Task);
}

/// FIFO queue drained explicitly by its owner.
///
/// Cloning yields another handle to the same queue. Not thread-safe: all
/// handles belong to the thread that created the queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run the oldest task, if any. Returns whether a task ran.
    pub fn run_next(&self) -> bool {
        // Release the borrow before running: the task may schedule more work.
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty, including tasks scheduled by the
    /// tasks being run. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "task queue idle");
        }
        ran
    }
}

impl Scheduler for TaskQueue {
    fn defer(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}
