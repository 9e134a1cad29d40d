// oakbase-core/src/executor.rs
//! The serial executor.
//!
//! Every public collection operation runs as a command on one dedicated
//! worker thread, strictly FIFO: the next command starts only after the
//! current one returned. This is the collection's sole mutual-exclusion
//! mechanism.
//!
//! The executor carries a `ready` flag. While not ready, ordinary commands
//! accumulate in a buffer; only a command submitted with the bypass flag
//! (the load of a persistent collection) enters the queue directly.
//! Completing the load marks the executor ready, which drains the buffer
//! into the queue in submission order.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::error::Result;

type Command = Box<dyn FnOnce() + Send + 'static>;

struct State {
    queue: VecDeque<Command>,
    buffer: VecDeque<Command>,
    ready: bool,
    shutdown: bool,
}

struct Inner {
    state: Mutex<State>,
    signal: Condvar,
}

pub struct Executor {
    inner: Arc<Inner>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Executor {
    /// Spawn the worker. In-memory collections start ready; persistent
    /// collections start paused until replay completes.
    pub fn new(ready: bool) -> Result<Executor> {
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                buffer: VecDeque::new(),
                ready,
                shutdown: false,
            }),
            signal: Condvar::new(),
        });

        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("oakbase-executor".to_string())
            .spawn(move || worker_loop(worker_inner))?;

        Ok(Executor {
            inner,
            worker: Some(worker),
        })
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.lock().ready
    }

    /// Mark the executor ready and move buffered commands into the queue,
    /// preserving their submission order.
    pub fn set_ready(&self) {
        let mut state = self.inner.state.lock();
        state.ready = true;
        while let Some(command) = state.buffer.pop_front() {
            state.queue.push_back(command);
        }
        self.inner.signal.notify_one();
    }

    fn push(&self, force: bool, command: Command) {
        let mut state = self.inner.state.lock();
        if state.ready || force {
            state.queue.push_back(command);
            self.inner.signal.notify_one();
        } else {
            state.buffer.push_back(command);
        }
    }

    /// Run `f` on the worker and block until it returns. `force` bypasses
    /// the ready gate.
    ///
    /// A failure inside `f` is a value, not a queue halt; the worker moves
    /// on to the next command regardless.
    pub fn submit<R, F>(&self, force: bool, f: F) -> R
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.push(
            force,
            Box::new(move || {
                let _ = tx.send(f());
            }),
        );
        rx.recv().expect("executor worker thread terminated")
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
        }
        self.inner.signal.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(inner: Arc<Inner>) {
    loop {
        let command = {
            let mut state = inner.state.lock();
            loop {
                if let Some(command) = state.queue.pop_front() {
                    break command;
                }
                if state.shutdown {
                    return;
                }
                inner.signal.wait(&mut state);
            }
        };
        command();
    }
}
