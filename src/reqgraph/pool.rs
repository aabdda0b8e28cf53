// Copyright (c) 2018 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! A fixed-size pool of worker threads draining a shared FIFO queue.
//! Workers block on a condition variable while the queue is empty. A task
//! may enqueue further tasks on the same queue from inside `run`; it must
//! not join its own pool from there.

use std::cmp;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use log::debug;

/// A unit of work. Boxed tasks are drawn from the queue in FIFO order and
/// run on whichever worker gets to them first; there is no ordering between
/// concurrent tasks.
pub trait Task: Send {
    fn run(self: Box<Self>, queue: &Queue);
}

/// Observable pool lifecycle.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum State {
    /// Not every worker has checked in yet.
    Starting,

    /// Workers are idle and the queue is empty.
    Ready,

    /// At least one task is queued or executing.
    Processing,

    /// Shutdown was requested; queued tasks are still being drained.
    Draining,

    /// Shutdown was requested and the queue is empty.
    Shutdown,
}

#[derive(Default)]
struct Inner {
    tasks: VecDeque<Box<dyn Task>>,
    running: usize,
    started: usize,
    threads: usize,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
    cvar: Condvar,
}

/// A handle for submitting tasks. Cheap to clone; tasks receive one so they
/// can schedule follow-up work.
#[derive(Clone, Default)]
pub struct Queue {
    shared: Arc<Shared>,
}

impl Queue {
    /// Adds a task to the back of the queue. Non-blocking. Tasks submitted
    /// after shutdown are dropped.
    pub fn enqueue(&self, task: Box<dyn Task>) {
        let mut inner = self.shared.inner.lock().unwrap();

        if inner.shutdown {
            debug!("dropping task enqueued after shutdown");
            return;
        }

        inner.tasks.push_back(task);
        self.shared.cvar.notify_one();
    }

    pub fn state(&self) -> State {
        let inner = self.shared.inner.lock().unwrap();
        let busy = inner.running > 0 || !inner.tasks.is_empty();

        if inner.shutdown {
            if busy {
                State::Draining
            } else {
                State::Shutdown
            }
        } else if inner.started < inner.threads {
            State::Starting
        } else if busy {
            State::Processing
        } else {
            State::Ready
        }
    }
}

/// The pool itself. Owns the worker threads; dropping it shuts down and
/// joins them.
pub struct Pool {
    queue: Queue,
    workers: Vec<JoinHandle<()>>,
}

impl Pool {
    /// Spawns `threads` workers (at least one). The pool reports `Starting`
    /// until every worker has checked in.
    pub fn new(threads: usize) -> Pool {
        let threads = cmp::max(threads, 1);
        let queue = Queue::default();
        queue.shared.inner.lock().unwrap().threads = threads;

        let workers = (0..threads)
            .map(|id| {
                let queue = queue.clone();
                thread::spawn(move || worker(id, queue))
            })
            .collect();

        Pool { queue, workers }
    }

    /// A submission handle independent of the pool's lifetime.
    pub fn queue(&self) -> Queue {
        self.queue.clone()
    }

    pub fn enqueue(&self, task: Box<dyn Task>) {
        self.queue.enqueue(task);
    }

    pub fn state(&self) -> State {
        self.queue.state()
    }

    /// Requests shutdown. No new tasks are accepted, but everything already
    /// queued is drained before the workers exit. Idempotent.
    pub fn shutdown(&self) {
        let mut inner = self.queue.shared.inner.lock().unwrap();
        inner.shutdown = true;
        self.queue.shared.cvar.notify_all();
    }

    /// Blocks until every worker has exited. Call `shutdown` first; must
    /// not be called from a task.
    pub fn join(mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.shutdown();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker(id: usize, queue: Queue) {
    debug!("worker {} starting", id);

    queue.shared.inner.lock().unwrap().started += 1;

    loop {
        let task = {
            let mut inner = queue.shared.inner.lock().unwrap();

            loop {
                if let Some(task) = inner.tasks.pop_front() {
                    inner.running += 1;
                    break Some(task);
                }

                if inner.shutdown {
                    break None;
                }

                inner = queue.shared.cvar.wait(inner).unwrap();
            }
        };

        match task {
            Some(task) => {
                task.run(&queue);

                let mut inner = queue.shared.inner.lock().unwrap();
                inner.running -= 1;
            }
            None => break,
        }
    }

    debug!("worker {} exiting", id);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    struct Count {
        counter: Arc<AtomicUsize>,
        done: mpsc::Sender<()>,
    }

    impl Task for Count {
        fn run(self: Box<Self>, _queue: &Queue) {
            self.counter.fetch_add(1, Ordering::SeqCst);
            let _ = self.done.send(());
        }
    }

    /// Holds its worker hostage until released, so tests can observe the
    /// pool mid-task.
    struct Block {
        started: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
    }

    impl Task for Block {
        fn run(self: Box<Self>, _queue: &Queue) {
            let _ = self.started.send(());
            let _ = self.release.recv();
        }
    }

    struct Fanout {
        counter: Arc<AtomicUsize>,
        done: mpsc::Sender<()>,
        remaining: usize,
    }

    impl Task for Fanout {
        fn run(self: Box<Self>, queue: &Queue) {
            self.counter.fetch_add(1, Ordering::SeqCst);

            if self.remaining > 0 {
                queue.enqueue(Box::new(Fanout {
                    counter: self.counter.clone(),
                    done: self.done.clone(),
                    remaining: self.remaining - 1,
                }));
            } else {
                let _ = self.done.send(());
            }
        }
    }

    #[test]
    fn test_runs_tasks() {
        let pool = Pool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        for _ in 0..100 {
            pool.enqueue(Box::new(Count {
                counter: counter.clone(),
                done: tx.clone(),
            }));
        }

        for _ in 0..100 {
            rx.recv().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 100);

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_tasks_spawn_tasks() {
        let pool = Pool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        pool.enqueue(Box::new(Fanout {
            counter: counter.clone(),
            done: tx,
            remaining: 9,
        }));

        rx.recv().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_shutdown_drains() {
        let pool = Pool::new(1);
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, _rx) = mpsc::channel();

        for _ in 0..50 {
            pool.enqueue(Box::new(Count {
                counter: counter.clone(),
                done: tx.clone(),
            }));
        }

        // Everything queued before shutdown still runs.
        pool.shutdown();
        pool.shutdown(); // idempotent
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn test_rejects_after_shutdown() {
        let pool = Pool::new(1);
        pool.shutdown();

        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, _rx) = mpsc::channel();

        pool.enqueue(Box::new(Count {
            counter: counter.clone(),
            done: tx,
        }));

        pool.join();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_states() {
        let pool = Pool::new(2);

        // Workers check in on their own schedule.
        while pool.state() == State::Starting {
            thread::yield_now();
        }
        assert_eq!(pool.state(), State::Ready);

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        pool.enqueue(Box::new(Block {
            started: started_tx,
            release: release_rx,
        }));

        started_rx.recv().unwrap();
        assert_eq!(pool.state(), State::Processing);

        release_tx.send(()).unwrap();
        while pool.state() == State::Processing {
            thread::yield_now();
        }
        assert_eq!(pool.state(), State::Ready);

        let queue = pool.queue();
        pool.shutdown();
        pool.join();
        assert_eq!(queue.state(), State::Shutdown);
    }

    #[test]
    fn test_draining_state() {
        let pool = Pool::new(1);

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        pool.enqueue(Box::new(Block {
            started: started_tx,
            release: release_rx,
        }));

        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, _rx) = mpsc::channel();
        for _ in 0..10 {
            pool.enqueue(Box::new(Count {
                counter: counter.clone(),
                done: tx.clone(),
            }));
        }

        // Shutdown with a task mid-flight and ten more queued behind it.
        started_rx.recv().unwrap();
        pool.shutdown();
        assert_eq!(pool.state(), State::Draining);

        release_tx.send(()).unwrap();
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }
}
