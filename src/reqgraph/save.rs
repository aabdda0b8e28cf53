// Copyright (c) 2019 Jason White
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

//! Saving. A closure save walks the reachable subgraph from its root,
//! persists the root itself, and schedules one single-node save per fresh
//! neighbor on the worker pool. Each task owns its own connection and
//! commits its own transaction, so per-node saves are atomic and unordered
//! with respect to one another.

use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};

use failure::err_msg;
use log::error;

use crate::error::Error;
use crate::node::{Graph, NodeId, SharedNode};
use crate::pool::{Queue, Task};
use crate::store::{codec, Db};

/// One event per node the save touches.
#[derive(Debug, Clone)]
pub enum SaveEvent {
    /// The node was persisted; its row and edges are on disk.
    Complete(NodeId),

    /// The node's transaction failed and was rolled back.
    Failed(NodeId, String),
}

#[derive(Default)]
struct Inner {
    pending: Mutex<usize>,
    cvar: Condvar,
}

/// Tracks a save tree. Completion is the conjunction of the root task's own
/// completion and that of every nested single-node task it spawned.
#[derive(Clone, Default)]
pub struct SaveTracker {
    inner: Arc<Inner>,
}

impl SaveTracker {
    fn add(&self, count: usize) {
        *self.inner.pending.lock().unwrap() += count;
    }

    fn done(&self) {
        let mut pending = self.inner.pending.lock().unwrap();
        *pending -= 1;

        if *pending == 0 {
            self.inner.cvar.notify_all();
        }
    }

    pub fn is_complete(&self) -> bool {
        *self.inner.pending.lock().unwrap() == 0
    }

    /// Blocks until the whole save tree has been persisted.
    pub fn wait(&self) {
        let mut pending = self.inner.pending.lock().unwrap();
        while *pending > 0 {
            pending = self.inner.cvar.wait(pending).unwrap();
        }
    }
}

/// Persists one node, or the closure reachable from it.
pub struct SaveNodes {
    db: Db,
    graph: Arc<Graph>,
    root: NodeId,
    this_node_only: bool,
    events: Sender<SaveEvent>,
    tracker: SaveTracker,
}

/// Schedules a closure save rooted at `root`. Returns immediately; the
/// tracker reports when the whole tree is on disk and the receiver sees one
/// event per node.
pub fn save(
    db: &Db,
    graph: &Arc<Graph>,
    root: NodeId,
    queue: &Queue,
) -> (SaveTracker, Receiver<SaveEvent>) {
    schedule(db, graph, root, false, queue)
}

/// Schedules a save of a single node: its rows and its immediate edges,
/// nothing else.
pub fn save_single(
    db: &Db,
    graph: &Arc<Graph>,
    root: NodeId,
    queue: &Queue,
) -> (SaveTracker, Receiver<SaveEvent>) {
    schedule(db, graph, root, true, queue)
}

fn schedule(
    db: &Db,
    graph: &Arc<Graph>,
    root: NodeId,
    this_node_only: bool,
    queue: &Queue,
) -> (SaveTracker, Receiver<SaveEvent>) {
    let (events, receiver) = mpsc::channel();
    let tracker = SaveTracker::default();

    tracker.add(1);
    queue.enqueue(Box::new(SaveNodes {
        db: db.clone(),
        graph: graph.clone(),
        root,
        this_node_only,
        events,
        tracker: tracker.clone(),
    }));

    (tracker, receiver)
}

impl Task for SaveNodes {
    fn run(self: Box<Self>, queue: &Queue) {
        if let Err(err) = self.execute(queue) {
            error!("saving {} failed: {}", self.root, err);

            // Subscribers may be long gone for fire-and-forget saves.
            let _ = self
                .events
                .send(SaveEvent::Failed(self.root, err.to_string()));
        }

        self.tracker.done();
    }
}

impl SaveNodes {
    fn execute(&self, queue: &Queue) -> Result<(), Error> {
        let shared = self
            .graph
            .node(self.root)
            .ok_or_else(|| err_msg(format!("no node {}", self.root)))?;

        let conn = self.db.connect()?;
        let tx = conn.unchecked_transaction()?;
        self.persist(&tx, &shared)?;
        tx.commit()?;

        let _ = self.events.send(SaveEvent::Complete(self.root));

        if !self.this_node_only {
            self.spread(queue);
        }

        Ok(())
    }

    /// Persists the task's own node. The codec clears the dirty flag
    /// before the kind-specific write and rewrites the edges whether or
    /// not the node was dirty.
    fn persist(
        &self,
        conn: &rusqlite::Connection,
        shared: &SharedNode,
    ) -> Result<(), Error> {
        let mut node = shared.lock().unwrap();
        codec::store(conn, &mut node)
    }

    /// Walks the reachable closure and schedules a single-node save for
    /// every fresh neighbor. The walk memoizes visited identifiers, so a
    /// node is scheduled at most once no matter how many links reach it.
    fn spread(&self, queue: &Queue) {
        let mut visited = HashSet::new();
        visited.insert(self.root);

        for id in self.graph.closure(self.root) {
            if !visited.insert(id) {
                continue;
            }

            self.tracker.add(1);
            queue.enqueue(Box::new(SaveNodes {
                db: self.db.clone(),
                graph: self.graph.clone(),
                root: id,
                this_node_only: true,
                events: self.events.clone(),
                tracker: self.tracker.clone(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::node::{Organization, Payload, Product, Project, Text};
    use crate::pool::Pool;
    use crate::store::tests::scratch;
    use crate::store::Direction;

    #[test]
    fn test_closure_save() {
        let (_dir, db) = scratch();
        let pool = Pool::new(4);

        let graph = Arc::new(Graph::new());
        let (org, _) = graph.add(Payload::Organization(Organization::new(
            "GCSE,Inc",
        )));
        let (project, _) =
            graph.add(Payload::Project(Project::new("Engineer")));
        let (product, _) =
            graph.add(Payload::Product(Product::new("Some SW")));

        graph.connect(org, project).unwrap();
        graph.connect(project, product).unwrap();

        let (tracker, events) = save(&db, &graph, org, &pool.queue());
        tracker.wait();
        assert!(tracker.is_complete());

        let mut completed = HashSet::new();
        while let Ok(event) = events.try_recv() {
            match event {
                SaveEvent::Complete(id) => {
                    completed.insert(id);
                }
                SaveEvent::Failed(id, message) => {
                    panic!("saving {} failed: {}", id, message)
                }
            }
        }

        assert_eq!(completed.len(), 3);

        let conn = db.connect().unwrap();
        for id in &[org, project, product] {
            assert!(codec::node_exists(&conn, *id).unwrap());
        }

        assert_eq!(
            codec::edges(&conn, org).unwrap(),
            vec![(project, Direction::Down)]
        );
        assert_eq!(
            codec::edges(&conn, project).unwrap(),
            vec![(org, Direction::Up), (product, Direction::Down)]
        );

        // Every saved node is clean afterwards.
        for id in &[org, project, product] {
            let node = graph.node(*id).unwrap();
            assert!(!node.lock().unwrap().is_changed());
        }

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_unchanged_node_keeps_stored_scalars() {
        let (_dir, db) = scratch();
        let pool = Pool::new(2);

        let graph = Arc::new(Graph::new());
        let (id, shared) = graph.add(Payload::Text(Text::new("original")));

        let (tracker, _events) = save(&db, &graph, id, &pool.queue());
        tracker.wait();

        // Tamper with the scalar while leaving the node clean. A visited
        // clean node must not have its kind row rewritten.
        {
            let mut node = shared.lock().unwrap();
            if let Payload::Text(t) = node.payload_raw_mut() {
                t.text = "tampered".into();
            }
            node.set_changed(false);
        }

        let (tracker, _events) = save(&db, &graph, id, &pool.queue());
        tracker.wait();

        let conn = db.connect().unwrap();
        let stored: String = conn
            .query_row("SELECT text FROM text WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(stored, "original");

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_single_node_save_rewrites_edges() {
        let (_dir, db) = scratch();
        let pool = Pool::new(2);

        let graph = Arc::new(Graph::new());
        let (root, shared) = graph.add(Payload::Text(Text::new("root")));

        // Neighbors that have never been persisted themselves.
        let ghost = NodeId::generate();
        shared.lock().unwrap().add_down(ghost);

        let (tracker, _events) = save_single(&db, &graph, root, &pool.queue());
        tracker.wait();

        let conn = db.connect().unwrap();
        assert!(codec::node_exists(&conn, root).unwrap());
        assert!(!codec::node_exists(&conn, ghost).unwrap());
        assert_eq!(
            codec::edges(&conn, root).unwrap(),
            vec![(ghost, Direction::Down)]
        );

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_cyclic_save_terminates() {
        let (_dir, db) = scratch();
        let pool = Pool::new(2);

        let graph = Arc::new(Graph::new());
        let (a, _) = graph.add(Payload::Text(Text::new("a")));
        let (b, _) = graph.add(Payload::Text(Text::new("b")));

        graph.connect(a, b).unwrap();
        graph.connect(b, a).unwrap();

        let (tracker, events) = save(&db, &graph, a, &pool.queue());
        tracker.wait();

        let completed = events.try_iter().count();
        assert_eq!(completed, 2);

        pool.shutdown();
        pool.join();
    }
}
