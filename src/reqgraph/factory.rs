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

//! The graph factory. Given a single root identifier, it rebuilds the whole
//! reachable graph: edge resolution runs sequentially on the factory task
//! over one connection, while the per-node field loads fan out across the
//! worker pool, each with a connection of its own. Visited identifiers are
//! memoized in the arena, so shared neighbors and cycles resolve to one
//! instance.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};

use log::error;
use rusqlite::Connection;

use crate::error::Error;
use crate::node::{Graph, Kind, NodeId, SharedNode};
use crate::pool::{Queue, Task};
use crate::store::{codec, Db, Direction};

#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// A node's kind-specific fields have been populated.
    Loaded(NodeId),

    /// The whole graph is assembled. Carries the root identifier, or `None`
    /// when the requested root was not in the store.
    Done(Option<NodeId>),

    /// A load failed. The graph may be partially populated.
    Error(String),
}

struct State {
    pending: usize,
    resolved: bool,
    done_sent: bool,
    root: Option<NodeId>,
    failed: Option<String>,
    events: Sender<LoadEvent>,
}

struct Inner {
    state: Mutex<State>,
    cvar: Condvar,
}

/// Aggregates completion of a factory run: the factory's own edge
/// resolution plus every per-node load it spawned.
#[derive(Clone)]
pub struct LoadTracker {
    inner: Arc<Inner>,
}

impl LoadTracker {
    fn new(events: Sender<LoadEvent>) -> LoadTracker {
        LoadTracker {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    pending: 0,
                    resolved: false,
                    done_sent: false,
                    root: None,
                    failed: None,
                    events,
                }),
                cvar: Condvar::new(),
            }),
        }
    }

    fn add(&self) {
        self.inner.state.lock().unwrap().pending += 1;
    }

    fn loaded(&self, id: NodeId) {
        let mut state = self.inner.state.lock().unwrap();
        let _ = state.events.send(LoadEvent::Loaded(id));
        state.pending -= 1;
        self.finish(state);
    }

    fn failed(&self, message: String) {
        let mut state = self.inner.state.lock().unwrap();
        let _ = state.events.send(LoadEvent::Error(message.clone()));
        state.failed = Some(message);
        state.pending -= 1;
        self.finish(state);
    }

    fn resolved(&self, root: Option<NodeId>) {
        let mut state = self.inner.state.lock().unwrap();
        state.resolved = true;
        state.root = root;
        self.finish(state);
    }

    fn resolved_with_error(&self, message: String) {
        let mut state = self.inner.state.lock().unwrap();
        let _ = state.events.send(LoadEvent::Error(message.clone()));
        state.failed = Some(message);
        state.resolved = true;
        self.finish(state);
    }

    fn finish(&self, mut state: std::sync::MutexGuard<'_, State>) {
        if state.resolved && state.pending == 0 && !state.done_sent {
            state.done_sent = true;
            let _ = state.events.send(LoadEvent::Done(state.root));
            self.inner.cvar.notify_all();
        }
    }

    /// Blocks until the factory reports completion. The predicate guards
    /// against spurious wake-ups. Returns the root identifier, or `None`
    /// for an absent root; a failed load is an error.
    pub fn wait(&self) -> Result<Option<NodeId>, Error> {
        let mut state = self.inner.state.lock().unwrap();

        while !(state.resolved && state.pending == 0) {
            state = self.inner.cvar.wait(state).unwrap();
        }

        match state.failed.take() {
            Some(message) => Err(failure::err_msg(message)),
            None => Ok(state.root),
        }
    }
}

/// Rebuilds the graph reachable from a root identifier.
pub struct LoadGraph {
    db: Db,
    graph: Arc<Graph>,
    root: NodeId,
    tracker: LoadTracker,
}

/// Schedules a graph load. The returned arena fills in as the factory and
/// its per-node loaders make progress; use the tracker (or the `Done`
/// event) to find out when it is complete.
pub fn load_graph(
    db: &Db,
    root: NodeId,
    queue: &Queue,
) -> (Arc<Graph>, LoadTracker, Receiver<LoadEvent>) {
    let graph = Arc::new(Graph::new());
    let (events, receiver) = mpsc::channel();
    let tracker = LoadTracker::new(events);

    queue.enqueue(Box::new(LoadGraph {
        db: db.clone(),
        graph: graph.clone(),
        root,
        tracker: tracker.clone(),
    }));

    (graph, tracker, receiver)
}

impl Task for LoadGraph {
    fn run(self: Box<Self>, queue: &Queue) {
        match self.execute(queue) {
            Ok(root) => self.tracker.resolved(root),
            Err(err) => {
                error!("loading graph {} failed: {}", self.root, err);
                self.tracker.resolved_with_error(err.to_string());
            }
        }
    }
}

impl LoadGraph {
    fn execute(&self, queue: &Queue) -> Result<Option<NodeId>, Error> {
        let conn = self.db.connect()?;

        // One transaction for all of the edge resolution, so the factory
        // observes a consistent closure even while saves land elsewhere.
        let tx = conn.unchecked_transaction()?;

        // An absent root finishes with nothing rather than failing.
        let name = match codec::node_kind(&tx, self.root)? {
            Some(name) => name,
            None => return Ok(None),
        };

        self.resolve(&tx, self.root, &name, queue)?;
        tx.commit()?;

        Ok(Some(self.root))
    }

    /// Allocates a blank node for the identifier, schedules its field load,
    /// and recurses through its stored edges. Identifiers already in the
    /// arena are reused as-is, which both deduplicates shared neighbors and
    /// terminates cycles.
    fn resolve(
        &self,
        conn: &Connection,
        id: NodeId,
        kind_name: &str,
        queue: &Queue,
    ) -> Result<SharedNode, Error> {
        // Unknown kind names degrade to a neutral node with identity set,
        // never to a hole: edge wiring must still succeed.
        let kind = Kind::from_name(kind_name).unwrap_or(Kind::Node);

        let (shared, fresh) = self.graph.entry(id, kind);
        if !fresh {
            return Ok(shared);
        }

        self.tracker.add();
        queue.enqueue(Box::new(LoadNode {
            db: self.db.clone(),
            node: shared.clone(),
            id,
            tracker: self.tracker.clone(),
        }));

        for (neighbor, direction) in codec::edges(conn, id)? {
            let name = codec::node_kind(conn, neighbor)?
                .unwrap_or_else(|| Kind::Node.name().to_string());

            self.resolve(conn, neighbor, &name, queue)?;

            let mut node = shared.lock().unwrap();
            match direction {
                Direction::Up => node.add_up(neighbor),
                Direction::Down => node.add_down(neighbor),
            };
        }

        // Wiring is reconstruction, not mutation; the node comes out of the
        // factory clean.
        shared.lock().unwrap().set_changed(false);

        Ok(shared)
    }
}

/// Populates one node's kind-specific fields on a sibling worker.
struct LoadNode {
    db: Db,
    node: SharedNode,
    id: NodeId,
    tracker: LoadTracker,
}

impl Task for LoadNode {
    fn run(self: Box<Self>, _queue: &Queue) {
        let result = (|| -> Result<(), Error> {
            let conn = self.db.connect()?;
            let mut node = self.node.lock().unwrap();
            codec::load(&conn, &mut node)?;
            Ok(())
        })();

        match result {
            Ok(()) => self.tracker.loaded(self.id),
            Err(err) => {
                error!("loading {} failed: {}", self.id, err);
                self.tracker.failed(err.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::node::{
        Organization, Payload, Product, Project, Requirement, Text, UsAddress,
    };
    use crate::pool::Pool;
    use crate::save;
    use crate::store::tests::scratch;

    fn save_all(db: &Db, graph: &Arc<Graph>, root: NodeId, pool: &Pool) {
        let (tracker, _events) = save::save(db, graph, root, &pool.queue());
        tracker.wait();
    }

    #[test]
    fn test_save_then_load() {
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
        let (req_a, _) = graph.add(Payload::Requirement(Requirement::new(
            "Must be software",
        )));
        let (req_b, _) = graph.add(Payload::Requirement(Requirement::new(
            "Must be engineered",
        )));

        graph.connect(org, project).unwrap();
        graph.connect(project, product).unwrap();
        graph.connect(product, req_a).unwrap();
        graph.connect(product, req_b).unwrap();

        save_all(&db, &graph, product, &pool);

        let (loaded, tracker, events) =
            load_graph(&db, org, &pool.queue());
        assert_eq!(tracker.wait().unwrap(), Some(org));

        let mut saw_done = false;
        for event in events.try_iter() {
            match event {
                LoadEvent::Done(root) => {
                    saw_done = true;
                    assert_eq!(root, Some(org));
                }
                LoadEvent::Loaded(_) => {}
                LoadEvent::Error(message) => panic!("{}", message),
            }
        }
        assert!(saw_done);

        assert_eq!(loaded.len(), 5);

        let node = loaded.node(org).unwrap();
        let node = node.lock().unwrap();
        assert_eq!(node.kind(), Kind::Organization);
        assert_eq!(node.down(), &[project]);
        assert!(node.is_initialized());
        assert!(!node.is_changed());
        match node.payload() {
            Payload::Organization(o) => assert_eq!(o.name, "GCSE,Inc"),
            other => panic!("wrong payload: {:?}", other),
        }

        let node = loaded.node(product).unwrap();
        let node = node.lock().unwrap();
        assert_eq!(node.up(), &[project]);
        assert_eq!(node.down(), &[req_a, req_b]);

        let node = loaded.node(req_b).unwrap();
        let node = node.lock().unwrap();
        match node.payload() {
            Payload::Requirement(r) => {
                assert_eq!(r.title, "Must be engineered")
            }
            other => panic!("wrong payload: {:?}", other),
        }

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_absent_root() {
        let (_dir, db) = scratch();
        let pool = Pool::new(2);

        let (_graph, tracker, _events) =
            load_graph(&db, NodeId::generate(), &pool.queue());
        assert_eq!(tracker.wait().unwrap(), None);

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_cycle_load() {
        let (_dir, db) = scratch();
        let pool = Pool::new(4);

        let graph = Arc::new(Graph::new());
        let (a, _) = graph.add(Payload::Text(Text::new("a")));
        let (b, _) = graph.add(Payload::Text(Text::new("b")));
        graph.connect(a, b).unwrap();
        graph.connect(b, a).unwrap();

        save_all(&db, &graph, a, &pool);

        let (loaded, tracker, _events) = load_graph(&db, a, &pool.queue());
        assert_eq!(tracker.wait().unwrap(), Some(a));

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.closure(a).len(), 2);

        // Both halves point at the same instances.
        let la = loaded.node(a).unwrap();
        assert_eq!(la.lock().unwrap().down(), &[b]);
        let lb = loaded.node(b).unwrap();
        assert_eq!(lb.lock().unwrap().down(), &[a]);

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_unknown_kind_falls_back_to_neutral() {
        let (_dir, db) = scratch();
        let pool = Pool::new(2);

        let graph = Arc::new(Graph::new());
        let (root, _) = graph.add(Payload::Text(Text::new("root")));
        let (child, _) = graph.add(Payload::Text(Text::new("child")));
        graph.connect(root, child).unwrap();

        save_all(&db, &graph, root, &pool);

        // Rewrite the stored kind to something from a newer schema.
        {
            let conn = db.connect().unwrap();
            conn.execute(
                "UPDATE node SET kind_name = 'HoloDeck' WHERE id = ?1",
                [child],
            )
            .unwrap();
        }

        let (loaded, tracker, _events) = load_graph(&db, root, &pool.queue());
        assert_eq!(tracker.wait().unwrap(), Some(root));

        let node = loaded.node(child).unwrap();
        let node = node.lock().unwrap();
        assert_eq!(node.kind(), Kind::Node);
        assert!(node.is_initialized());
        assert_eq!(node.up(), &[root]);

        pool.shutdown();
        pool.join();
    }

    #[test]
    fn test_address_lines_resolved_through_edges() {
        let (_dir, db) = scratch();
        let pool = Pool::new(4);

        let graph = Arc::new(Graph::new());
        let (addr, shared) = graph.add(Payload::UsAddress(UsAddress {
            city: "Springfield".into(),
            state: "OR".into(),
            zipcode: "97477".into(),
            ..UsAddress::default()
        }));
        let (line, _) =
            graph.add(Payload::Text(Text::new("742 Evergreen Terrace")));

        // The column stores the head identifier; the edge table carries the
        // same neighbor so the factory can wire the instance.
        shared
            .lock()
            .unwrap()
            .payload_raw_mut()
            .set_address_lines(Some(line));
        graph.connect(addr, line).unwrap();

        save_all(&db, &graph, addr, &pool);

        let (loaded, tracker, _events) = load_graph(&db, addr, &pool.queue());
        assert_eq!(tracker.wait().unwrap(), Some(addr));

        let node = loaded.node(addr).unwrap();
        let node = node.lock().unwrap();
        assert_eq!(node.payload().address_lines(), Some(line));

        // The identifier in the column resolves to the arena instance.
        let line_node = loaded.node(line).unwrap();
        let line_node = line_node.lock().unwrap();
        match line_node.payload() {
            Payload::Text(t) => {
                assert_eq!(t.text, "742 Evergreen Terrace")
            }
            other => panic!("wrong payload: {:?}", other),
        }

        pool.shutdown();
        pool.join();
    }
}
