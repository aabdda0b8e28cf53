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

//! The node model. A node is identity (a v7 UUID), two ordered link lists
//! (`up` towards owners, `down` towards contents), a dirty flag, and a
//! kind-specific payload. Nodes live in an arena keyed by identifier; links
//! are identifiers resolved through the arena, so shared ownership and
//! cycles are legal and cheap.

mod id;
mod payload;

pub use self::id::NodeId;
pub use self::payload::{
    Actor, Commit, Completed, Effort, EmailAddress, Event, Goal, GraphNode,
    InternationalAddress, Kind, KeyValue, Organization, Payload, Person,
    PhoneNumber, Product, Project, Purpose, RecurringTodo, Requirement, Role,
    ServerLocatorNode, Story, Text, TimeEstimate, Todo, UsAddress, UseCase,
};

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use failure::err_msg;

use crate::error::{Error, NotChanged, NotDiscarded};

/// A node handle. The mutex guards the node's mutable fields; it is held
/// while the archive emits or ingests the node and while a load task fills
/// its row in.
pub type SharedNode = Arc<Mutex<Node>>;

pub struct Node {
    id: Option<NodeId>,

    /// Distinct from `id.is_some()`: carries intent across load and
    /// deserialize so a traversal never re-assigns identity.
    initialized: bool,

    /// True when an owned field changed since the last successful persist.
    /// Cleared by the persister just before the kind-specific write.
    changed: bool,

    up: Vec<NodeId>,
    down: Vec<NodeId>,

    payload: Payload,
}

impl Node {
    /// A new node: uncommitted, empty links, identity unset. Identity is
    /// conferred by `init` (or by `set_id` for external identity).
    pub fn new(payload: Payload) -> Node {
        Node {
            id: None,
            initialized: false,
            changed: true,
            up: Vec::new(),
            down: Vec::new(),
            payload,
        }
    }

    /// A blank node of the given kind with identity pre-set. Used when
    /// reconstructing from the store; the node starts clean.
    pub fn blank(kind: Kind, id: NodeId) -> Node {
        Node {
            id: Some(id),
            initialized: true,
            changed: false,
            up: Vec::new(),
            down: Vec::new(),
            payload: Payload::blank(kind),
        }
    }

    /// Confers identity. Re-running replaces the identifier.
    pub fn init(&mut self) -> NodeId {
        let id = NodeId::generate();
        self.id = Some(id);
        self.initialized = true;
        id
    }

    /// Sets identity from an external source. The node is then considered
    /// already initialized and must not be `init`ed again by traversals.
    pub fn set_id(&mut self, s: &str) -> Result<NodeId, Error> {
        let id: NodeId = s.parse()?;
        self.set_node_id(id);
        Ok(id)
    }

    pub fn set_node_id(&mut self, id: NodeId) {
        self.id = Some(id);
        self.initialized = true;
    }

    pub fn node_id(&self) -> Option<NodeId> {
        self.id
    }

    /// The hyphenated identifier, or the empty string before `init`.
    pub fn id_string(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => String::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn kind(&self) -> Kind {
        self.payload.kind()
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    pub fn up(&self) -> &[NodeId] {
        &self.up
    }

    pub fn down(&self) -> &[NodeId] {
        &self.down
    }

    /// Appends an up link. Idempotent: a neighbor already present by
    /// identifier is not appended again.
    pub fn add_up(&mut self, id: NodeId) -> NodeId {
        if self.find_up(id).is_none() {
            self.up.push(id);
            self.changed = true;
        }
        id
    }

    /// Appends a down link. Idempotent by identifier.
    pub fn add_down(&mut self, id: NodeId) -> NodeId {
        if self.find_down(id).is_none() {
            self.down.push(id);
            self.changed = true;
        }
        id
    }

    pub fn find_up(&self, id: NodeId) -> Option<NodeId> {
        self.up.iter().cloned().find(|n| *n == id)
    }

    pub fn find_down(&self, id: NodeId) -> Option<NodeId> {
        self.down.iter().cloned().find(|n| *n == id)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Mutable access to the payload. This is the single gate every scalar
    /// mutation goes through: it refuses committed nodes and flips the
    /// dirty flag.
    pub fn payload_mut(&mut self) -> Result<&mut Payload, Error> {
        self.ensure_mutable()?;
        self.changed = true;
        Ok(&mut self.payload)
    }

    /// Payload access that bypasses the commit guard. Reserved for the
    /// store and archive, which reconstruct state rather than mutate it.
    pub(crate) fn payload_raw_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    fn ensure_mutable(&self) -> Result<(), NotChanged> {
        if let Some(commit) = self.payload.commit() {
            if commit.committed {
                return Err(NotChanged::new(self.kind_name()));
            }
        }

        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.payload.commit().map_or(false, |c| c.committed)
    }

    /// Freezes the node's scalar attributes. One-way; errors on kinds that
    /// do not carry commit state.
    pub fn commit(&mut self) -> Result<(), Error> {
        let kind = self.kind_name();
        match self.payload.commit_mut() {
            Some(commit) => {
                commit.committed = true;
                Ok(())
            }
            None => Err(err_msg(format!("{} nodes cannot be committed", kind))),
        }
    }

    /// Kind-specific references beyond the generic link lists, in traversal
    /// order: change parent, change child, then address lines.
    pub fn extras(&self) -> Vec<NodeId> {
        let mut extras = Vec::new();

        if let Some(commit) = self.payload.commit() {
            extras.extend(commit.change_parent);
            extras.extend(commit.change_child);
        }

        extras.extend(self.payload.address_lines());
        extras
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind_name(), self.id_string())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// An arena of nodes keyed by identifier. A graph is addressable from any
/// of its nodes; there is no distinguished root at this layer.
#[derive(Default, Debug)]
pub struct Graph {
    nodes: Mutex<HashMap<NodeId, SharedNode>>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Inserts a node that already has identity. Returns the shared handle.
    pub fn insert(&self, node: Node) -> Result<SharedNode, Error> {
        let id = node
            .node_id()
            .ok_or_else(|| err_msg("cannot insert a node without identity"))?;

        let shared = Arc::new(Mutex::new(node));
        self.nodes.lock().unwrap().insert(id, shared.clone());
        Ok(shared)
    }

    /// Creates, initializes, and inserts a node in one step.
    pub fn add(&self, payload: Payload) -> (NodeId, SharedNode) {
        let mut node = Node::new(payload);
        let id = node.init();

        let shared = Arc::new(Mutex::new(node));
        self.nodes.lock().unwrap().insert(id, shared.clone());
        (id, shared)
    }

    pub fn node(&self, id: NodeId) -> Option<SharedNode> {
        self.nodes.lock().unwrap().get(&id).cloned()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.lock().unwrap().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().unwrap().is_empty()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.lock().unwrap().keys().cloned().collect()
    }

    pub fn remove(&self, id: NodeId) -> Option<SharedNode> {
        self.nodes.lock().unwrap().remove(&id)
    }

    /// Returns the node with the given identifier, allocating a blank node
    /// of the given kind if it is not present yet. Reconstruction paths use
    /// this to deduplicate shared references.
    pub(crate) fn entry(&self, id: NodeId, kind: Kind) -> (SharedNode, bool) {
        let mut nodes = self.nodes.lock().unwrap();

        if let Some(shared) = nodes.get(&id) {
            return (shared.clone(), false);
        }

        let shared = Arc::new(Mutex::new(Node::blank(kind, id)));
        nodes.insert(id, shared.clone());
        (shared, true)
    }

    /// Establishes both halves of a parent/child link. This is the
    /// canonical way to wire two nodes together.
    pub fn connect(&self, parent: NodeId, child: NodeId) -> Result<(), Error> {
        let p = self
            .node(parent)
            .ok_or_else(|| err_msg(format!("no node {}", parent)))?;
        let c = self
            .node(child)
            .ok_or_else(|| err_msg(format!("no node {}", child)))?;

        p.lock().unwrap().add_down(child);
        c.lock().unwrap().add_up(parent);
        Ok(())
    }

    /// Visits every node reachable from `root` exactly once: the node
    /// itself, then its up links, its down links, and finally kind-specific
    /// extras. Safe on arbitrary cycles; read-only.
    pub fn traverse<F>(&self, root: NodeId, mut visit: F)
    where
        F: FnMut(&Node),
    {
        let mut visited = HashSet::new();
        self.walk(root, &mut visited, &mut visit);
    }

    fn walk<F>(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        visit: &mut F,
    ) where
        F: FnMut(&Node),
    {
        if !visited.insert(id) {
            return;
        }

        // Dangling identifiers are skipped; links are not required to
        // resolve while a graph is being assembled.
        let shared = match self.node(id) {
            Some(shared) => shared,
            None => return,
        };

        let (up, down, extras) = {
            let node = shared.lock().unwrap();
            visit(&node);
            (node.up.clone(), node.down.clone(), node.extras())
        };

        for neighbor in up {
            self.walk(neighbor, visited, visit);
        }

        for neighbor in down {
            self.walk(neighbor, visited, visit);
        }

        for neighbor in extras {
            self.walk(neighbor, visited, visit);
        }
    }

    /// The identifiers of the reachable closure from `root`, in traversal
    /// order.
    pub fn closure(&self, root: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.traverse(root, |node| {
            if let Some(id) = node.node_id() {
                ids.push(id);
            }
        });
        ids
    }

    /// Returns the change node for a committed node, creating it on first
    /// use. The change node is a same-kind copy of the scalars with a fresh
    /// identity, back-linked through its change parent.
    pub fn change_node(&self, id: NodeId) -> Result<SharedNode, Error> {
        let shared = self
            .node(id)
            .ok_or_else(|| err_msg(format!("no node {}", id)))?;

        let (payload, existing) = {
            let node = shared.lock().unwrap();
            let commit = node.payload.commit().ok_or_else(|| {
                err_msg(format!("{} nodes carry no change chain", node.kind_name()))
            })?;
            (node.payload.clone(), commit.change_child)
        };

        if let Some(child) = existing {
            return self
                .node(child)
                .ok_or_else(|| err_msg(format!("dangling change node {}", child)));
        }

        let mut child = Node::new(payload);
        {
            let commit = child.payload_raw_mut().commit_mut().unwrap();
            commit.committed = false;
            commit.change_parent = Some(id);
            commit.change_child = None;
        }
        let child_id = child.init();
        let child_shared = self.insert(child)?;

        shared
            .lock()
            .unwrap()
            .payload_raw_mut()
            .commit_mut()
            .unwrap()
            .change_child = Some(child_id);

        Ok(child_shared)
    }

    /// Drops an uncommitted change node. Fails with `NotDiscarded` when the
    /// change node has been committed; succeeds trivially when there is
    /// none.
    pub fn discard_change(&self, id: NodeId) -> Result<(), Error> {
        let shared = self
            .node(id)
            .ok_or_else(|| err_msg(format!("no node {}", id)))?;

        let (kind, child_id) = {
            let node = shared.lock().unwrap();
            let commit = node.payload.commit().ok_or_else(|| {
                err_msg(format!("{} nodes carry no change chain", node.kind_name()))
            })?;
            (node.kind_name(), commit.change_child)
        };

        let child_id = match child_id {
            Some(child_id) => child_id,
            None => return Ok(()),
        };

        if let Some(child) = self.node(child_id) {
            if child.lock().unwrap().is_committed() {
                return Err(NotDiscarded::new(kind).into());
            }
        }

        shared
            .lock()
            .unwrap()
            .payload_raw_mut()
            .commit_mut()
            .unwrap()
            .change_child = None;

        self.remove(child_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        let mut node = Node::new(Payload::Node);
        assert!(!node.is_initialized());
        assert!(node.id_string().is_empty());

        let id = node.init();
        assert!(node.is_initialized());
        assert_eq!(id.version(), 7);
        assert!(!node.id_string().is_empty());

        // Re-running replaces the identifier.
        let other = node.init();
        assert_ne!(id, other);
    }

    #[test]
    fn test_external_identity() {
        let id = NodeId::generate();

        let mut node = Node::new(Payload::Node);
        node.set_id(&id.to_string()).unwrap();

        assert!(node.is_initialized());
        assert_eq!(node.node_id(), Some(id));
    }

    #[test]
    fn test_links_idempotent() {
        let mut node = Node::new(Payload::Node);
        let neighbor = NodeId::generate();

        node.add_down(neighbor);
        node.add_down(neighbor);
        node.add_up(neighbor);
        node.add_up(neighbor);

        assert_eq!(node.down().len(), 1);
        assert_eq!(node.up().len(), 1);
        assert_eq!(node.find_down(neighbor), Some(neighbor));
        assert_eq!(node.find_up(neighbor), Some(neighbor));
        assert_eq!(node.find_down(NodeId::generate()), None);
    }

    #[test]
    fn test_connect() {
        let graph = Graph::new();
        let (parent, p) = graph.add(Payload::Organization(
            Organization::new("GCSE,Inc"),
        ));
        let (child, c) =
            graph.add(Payload::Project(Project::new("Engineer")));

        graph.connect(parent, child).unwrap();

        assert_eq!(p.lock().unwrap().find_down(child), Some(child));
        assert_eq!(c.lock().unwrap().find_up(parent), Some(parent));
    }

    #[test]
    fn test_traverse_cycle() {
        let graph = Graph::new();
        let (a, _) = graph.add(Payload::Node);
        let (b, _) = graph.add(Payload::Node);
        let (c, _) = graph.add(Payload::Node);

        // a -> b -> c -> a
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        graph.connect(c, a).unwrap();

        let mut seen = Vec::new();
        graph.traverse(a, |node| seen.push(node.node_id().unwrap()));

        assert_eq!(seen.len(), 3);

        let unique: std::collections::HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_traverse_visits_extras() {
        let graph = Graph::new();
        let (addr, shared) = graph.add(Payload::UsAddress(UsAddress {
            city: "Springfield".into(),
            ..UsAddress::default()
        }));
        let (line, _) = graph.add(Payload::Text(Text::new("742 Evergreen")));

        shared
            .lock()
            .unwrap()
            .payload_raw_mut()
            .set_address_lines(Some(line));

        let closure = graph.closure(addr);
        assert!(closure.contains(&line));
    }

    #[test]
    fn test_committed_rejects_mutation() {
        let graph = Graph::new();
        let (id, shared) =
            graph.add(Payload::Requirement(Requirement::new("t")));

        {
            let mut node = shared.lock().unwrap();
            if let Payload::Requirement(r) = node.payload_mut().unwrap() {
                r.text = "x".into();
            }
            node.commit().unwrap();
        }

        {
            let mut node = shared.lock().unwrap();
            let err = node.payload_mut().unwrap_err();
            assert!(err.downcast_ref::<NotChanged>().is_some());
        }

        // The change node is a mutable same-kind copy.
        let change = graph.change_node(id).unwrap();
        {
            let mut node = change.lock().unwrap();
            assert_eq!(node.kind(), Kind::Requirement);
            if let Payload::Requirement(r) = node.payload_mut().unwrap() {
                assert_eq!(r.title, "t");
                r.title = "u".into();
            }
        }

        // Discarding an uncommitted change node works...
        graph.discard_change(id).unwrap();

        // ...but a committed change node refuses to go away.
        let change = graph.change_node(id).unwrap();
        change.lock().unwrap().commit().unwrap();

        let err = graph.discard_change(id).unwrap_err();
        assert!(err.downcast_ref::<NotDiscarded>().is_some());
    }

    #[test]
    fn test_change_node_reused() {
        let graph = Graph::new();
        let (id, shared) = graph.add(Payload::Product(Product::new("SW")));
        shared.lock().unwrap().commit().unwrap();

        let a = graph.change_node(id).unwrap();
        let b = graph.change_node(id).unwrap();

        assert_eq!(
            a.lock().unwrap().node_id(),
            b.lock().unwrap().node_id()
        );
    }
}
