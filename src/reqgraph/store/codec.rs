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

//! The store codec. The base half writes the `node` row and streams the
//! edge rows; the kind half dispatches on the payload variant to the SQL in
//! `row`. Every kind's insert and update call through the base first, so
//! the edge table always matches the in-memory link lists after a write.
//!
//! Edges are rewritten wholesale: delete everything owned by the
//! identifier, then stream the current sets back. A diff would be cheaper
//! but could leave stale rows behind on a crashed half-write; this cannot.

use std::fmt;
use std::str::FromStr;

use failure::err_msg;
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::row::Row;
use crate::error::{Error, UnknownKind};
use crate::node::{Kind, Node, NodeId, Payload};

/// The direction of a stored edge, relative to the owning identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(err_msg(format!("bad edge direction '{}'", s))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Looks up a kind by its stable name. This is the registry's name index;
/// names that are not in the closed set are a hard error on the write and
/// remove paths.
pub fn kind_for(name: &str) -> Result<Kind, Error> {
    Kind::from_name(name).ok_or_else(|| UnknownKind::new(name).into())
}

fn require_id(node: &Node) -> Result<NodeId, Error> {
    node.node_id()
        .ok_or_else(|| err_msg("cannot persist a node without identity"))
}

/// Whether the `node` row for this identifier exists.
pub fn node_exists(conn: &Connection, id: NodeId) -> Result<bool, Error> {
    let found = conn
        .query_row("SELECT id FROM node WHERE id = ?1", params![id], |_| {
            Ok(())
        })
        .optional()?;
    Ok(found.is_some())
}

/// The stored kind name for an identifier, if any.
pub fn node_kind(
    conn: &Connection,
    id: NodeId,
) -> Result<Option<String>, Error> {
    Ok(conn
        .query_row(
            "SELECT kind_name FROM node WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Whether the kind-specific row for this node exists. The neutral kind
/// falls back to the `node` table since it has no table of its own.
pub fn kind_exists(
    conn: &Connection,
    kind: Kind,
    id: NodeId,
) -> Result<bool, Error> {
    let table = match kind.table() {
        Some(table) => table,
        None => return node_exists(conn, id),
    };

    let found = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Base insert: the `node` row plus the edge rows.
pub fn node_insert(conn: &Connection, node: &Node) -> Result<(), Error> {
    let id = require_id(node)?;

    conn.execute(
        "INSERT INTO node (id, kind_name) VALUES (?1, ?2)",
        params![id, node.kind_name()],
    )?;

    stream_edges(conn, id, node)
}

/// Base update: refresh the kind name, drop every edge owned by this
/// identifier, and stream the current link lists back.
pub fn node_update(conn: &Connection, node: &Node) -> Result<(), Error> {
    let id = require_id(node)?;

    conn.execute(
        "UPDATE node SET kind_name = ?2 WHERE id = ?1",
        params![id, node.kind_name()],
    )?;

    conn.execute(
        "DELETE FROM node_associations WHERE id = ?1",
        params![id],
    )?;

    stream_edges(conn, id, node)
}

fn stream_edges(
    conn: &Connection,
    id: NodeId,
    node: &Node,
) -> Result<(), Error> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO node_associations (id, neighbor, direction) \
         VALUES (?1, ?2, ?3)",
    )?;

    for neighbor in node.up() {
        stmt.execute(params![id, neighbor, Direction::Up.as_str()])?;
    }

    for neighbor in node.down() {
        stmt.execute(params![id, neighbor, Direction::Down.as_str()])?;
    }

    Ok(())
}

/// Base remove: every edge that mentions the identifier on either side,
/// then the `node` row.
pub fn node_remove(conn: &Connection, id: NodeId) -> Result<(), Error> {
    conn.execute(
        "DELETE FROM node_associations WHERE id = ?1 OR neighbor = ?1",
        params![id],
    )?;
    conn.execute("DELETE FROM node WHERE id = ?1", params![id])?;
    Ok(())
}

/// The stored edges owned by an identifier, in the order they were
/// streamed.
pub fn edges(
    conn: &Connection,
    id: NodeId,
) -> Result<Vec<(NodeId, Direction)>, Error> {
    let mut stmt = conn.prepare_cached(
        "SELECT neighbor, direction FROM node_associations \
         WHERE id = ?1 ORDER BY rowid",
    )?;

    let rows = stmt.query_map(params![id], |row| {
        Ok((row.get::<_, NodeId>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut edges = Vec::new();
    for row in rows {
        let (neighbor, direction) = row?;
        edges.push((neighbor, direction.parse()?));
    }

    Ok(edges)
}

fn insert_row<T: Row>(
    conn: &Connection,
    id: NodeId,
    payload: &T,
) -> Result<(), Error> {
    let mut params: Vec<&dyn ToSql> = vec![&id];
    params.extend(payload.bind());
    conn.execute(T::INSERT, params.as_slice())?;
    Ok(())
}

fn update_row<T: Row>(
    conn: &Connection,
    id: NodeId,
    payload: &T,
) -> Result<(), Error> {
    let mut params: Vec<&dyn ToSql> = vec![&id];
    params.extend(payload.bind());
    conn.execute(T::UPDATE, params.as_slice())?;
    Ok(())
}

fn load_row<T: Row>(
    conn: &Connection,
    id: NodeId,
) -> Result<Option<T>, Error> {
    Ok(conn
        .query_row(T::SELECT, params![id], |row| T::read(row))
        .optional()?)
}

macro_rules! dispatch {
    ($payload:expr, $conn:expr, $id:expr, $op:ident) => {
        match $payload {
            Payload::Node => Ok(()),
            Payload::GraphNode(x) => $op($conn, $id, x),
            Payload::Organization(x) => $op($conn, $id, x),
            Payload::Product(x) => $op($conn, $id, x),
            Payload::Project(x) => $op($conn, $id, x),
            Payload::Requirement(x) => $op($conn, $id, x),
            Payload::Story(x) => $op($conn, $id, x),
            Payload::UseCase(x) => $op($conn, $id, x),
            Payload::Text(x) => $op($conn, $id, x),
            Payload::Completed(x) => $op($conn, $id, x),
            Payload::KeyValue(x) => $op($conn, $id, x),
            Payload::TimeEstimate(x) => $op($conn, $id, x),
            Payload::Effort(x) => $op($conn, $id, x),
            Payload::Role(x) => $op($conn, $id, x),
            Payload::Actor(x) => $op($conn, $id, x),
            Payload::Goal(x) => $op($conn, $id, x),
            Payload::Purpose(x) => $op($conn, $id, x),
            Payload::Person(x) => $op($conn, $id, x),
            Payload::EmailAddress(x) => $op($conn, $id, x),
            Payload::PhoneNumber(x) => $op($conn, $id, x),
            Payload::InternationalAddress(x) => $op($conn, $id, x),
            Payload::UsAddress(x) => $op($conn, $id, x),
            Payload::Event(x) => $op($conn, $id, x),
            Payload::RecurringTodo(x) => $op($conn, $id, x),
            Payload::Todo(x) => $op($conn, $id, x),
            Payload::ServerLocatorNode(x) => $op($conn, $id, x),
        }
    };
}

/// Writes the kind-specific row for a new node.
fn kind_insert(conn: &Connection, node: &Node) -> Result<(), Error> {
    let id = require_id(node)?;
    dispatch!(node.payload(), conn, id, insert_row)
}

/// Updates the kind-specific row for an existing node.
fn kind_update(conn: &Connection, node: &Node) -> Result<(), Error> {
    let id = require_id(node)?;
    dispatch!(node.payload(), conn, id, update_row)
}

/// Writes the kind-specific row, inserting or updating by existence.
pub fn kind_upsert(conn: &Connection, node: &Node) -> Result<(), Error> {
    let id = require_id(node)?;

    if kind_exists(conn, node.kind(), id)? {
        kind_update(conn, node)
    } else {
        kind_insert(conn, node)
    }
}

/// Full insert: base tables first, then the kind table.
pub fn insert(conn: &Connection, node: &Node) -> Result<(), Error> {
    node_insert(conn, node)?;
    kind_insert(conn, node)
}

/// Full update: base tables (with the edge rewrite) first, then the kind
/// table.
pub fn update(conn: &Connection, node: &Node) -> Result<(), Error> {
    node_update(conn, node)?;
    kind_update(conn, node)
}

/// Inserts or updates a whole node. A node absent from the store is
/// inserted outright. An existing node always gets its base rows refreshed
/// (including the edge rewrite), but its kind-specific row is written only
/// when the node is dirty. The dirty flag is cleared just before the kind
/// write so the stored row captures the post-save state.
pub fn store(conn: &Connection, node: &mut Node) -> Result<(), Error> {
    let id = require_id(node)?;

    let was_changed = node.is_changed();
    node.set_changed(false);

    if !node_exists(conn, id)? {
        insert(conn, node)
    } else {
        node_update(conn, node)?;

        if was_changed {
            kind_upsert(conn, node)
        } else {
            Ok(())
        }
    }
}

/// Populates the node's scalar attributes from its kind row. Returns true
/// iff a row was found. The neutral kind (and any node without a row) is a
/// silent miss so a raw node can be fetched safely. The address line
/// *instance* is not resolved here; only the identifier column is read.
pub fn load(conn: &Connection, node: &mut Node) -> Result<bool, Error> {
    let id = require_id(node)?;

    let loaded = match node.kind() {
        Kind::Node => None,
        Kind::GraphNode => load_row(conn, id)?.map(Payload::GraphNode),
        Kind::Organization => load_row(conn, id)?.map(Payload::Organization),
        Kind::Product => load_row(conn, id)?.map(Payload::Product),
        Kind::Project => load_row(conn, id)?.map(Payload::Project),
        Kind::Requirement => load_row(conn, id)?.map(Payload::Requirement),
        Kind::Story => load_row(conn, id)?.map(Payload::Story),
        Kind::UseCase => load_row(conn, id)?.map(Payload::UseCase),
        Kind::Text => load_row(conn, id)?.map(Payload::Text),
        Kind::Completed => load_row(conn, id)?.map(Payload::Completed),
        Kind::KeyValue => load_row(conn, id)?.map(Payload::KeyValue),
        Kind::TimeEstimate => load_row(conn, id)?.map(Payload::TimeEstimate),
        Kind::Effort => load_row(conn, id)?.map(Payload::Effort),
        Kind::Role => load_row(conn, id)?.map(Payload::Role),
        Kind::Actor => load_row(conn, id)?.map(Payload::Actor),
        Kind::Goal => load_row(conn, id)?.map(Payload::Goal),
        Kind::Purpose => load_row(conn, id)?.map(Payload::Purpose),
        Kind::Person => load_row(conn, id)?.map(Payload::Person),
        Kind::EmailAddress => {
            load_row(conn, id)?.map(Payload::EmailAddress)
        }
        Kind::PhoneNumber => load_row(conn, id)?.map(Payload::PhoneNumber),
        Kind::InternationalAddress => {
            load_row(conn, id)?.map(Payload::InternationalAddress)
        }
        Kind::UsAddress => load_row(conn, id)?.map(Payload::UsAddress),
        Kind::Event => load_row(conn, id)?.map(Payload::Event),
        Kind::RecurringTodo => {
            load_row(conn, id)?.map(Payload::RecurringTodo)
        }
        Kind::Todo => load_row(conn, id)?.map(Payload::Todo),
        Kind::ServerLocatorNode => {
            load_row(conn, id)?.map(Payload::ServerLocatorNode)
        }
    };

    match loaded {
        Some(payload) => {
            *node.payload_raw_mut() = payload;
            node.set_changed(false);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Removes a node: edges on either side, the `node` row, and the kind row.
pub fn remove(conn: &Connection, node: &Node) -> Result<(), Error> {
    let id = require_id(node)?;
    node_remove(conn, id)?;

    if let Some(table) = node.kind().table() {
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table),
            params![id],
        )?;
    }

    Ok(())
}

/// Removes whatever is stored under an identifier, resolving the kind from
/// the `node` row. Fails with `UnknownKind` when the stored kind name is
/// not in the registry; does nothing when the identifier is absent.
pub fn remove_by_id(conn: &Connection, id: NodeId) -> Result<(), Error> {
    let name = match node_kind(conn, id)? {
        Some(name) => name,
        None => return Ok(()),
    };

    let kind = kind_for(&name)?;
    remove(conn, &Node::blank(kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::node::{Organization, Requirement, Text, Todo, UsAddress};
    use crate::store::tests::scratch;

    #[test]
    fn test_insert_load_round_trip() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Requirement(Requirement {
            title: "Must be software".into(),
            text: "All of it".into(),
            functional: true,
            commit: Default::default(),
        }));
        let id = node.init();

        store(&conn, &mut node).unwrap();
        assert!(!node.is_changed());

        let mut blank = Node::blank(Kind::Requirement, id);
        assert!(load(&conn, &mut blank).unwrap());

        match blank.payload() {
            Payload::Requirement(r) => {
                assert_eq!(r.title, "Must be software");
                assert_eq!(r.text, "All of it");
                assert!(r.functional);
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_row() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut blank = Node::blank(Kind::Story, NodeId::generate());
        assert!(!load(&conn, &mut blank).unwrap());

        // The neutral kind never has a row.
        let mut neutral = Node::blank(Kind::Node, NodeId::generate());
        assert!(!load(&conn, &mut neutral).unwrap());
    }

    #[test]
    fn test_update_rewrites_edges() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let a = NodeId::generate();
        let b = NodeId::generate();

        let mut node = Node::new(Payload::Text(Text::new("x")));
        let id = node.init();
        node.add_down(a);
        node.add_down(b);

        store(&conn, &mut node).unwrap();
        assert_eq!(edges(&conn, id).unwrap().len(), 2);

        // Shrink the link list; stale rows must not survive the update.
        let mut node = Node::blank(Kind::Text, id);
        node.add_down(b);
        node.add_up(a);

        store(&conn, &mut node).unwrap();

        let stored = edges(&conn, id).unwrap();
        assert_eq!(stored, vec![(a, Direction::Up), (b, Direction::Down)]);
    }

    #[test]
    fn test_update_choice_by_existence() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node =
            Node::new(Payload::Organization(Organization::new("Acme")));
        let id = node.init();

        assert!(!kind_exists(&conn, Kind::Organization, id).unwrap());
        store(&conn, &mut node).unwrap();
        assert!(kind_exists(&conn, Kind::Organization, id).unwrap());

        // A second store with the same identity must update, not insert.
        let mut node = Node::blank(Kind::Organization, id);
        if let Payload::Organization(o) = node.payload_mut().unwrap() {
            o.name = "Acme, Inc.".into();
        }
        store(&conn, &mut node).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM organization", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 1);

        let mut loaded = Node::blank(Kind::Organization, id);
        assert!(load(&conn, &mut loaded).unwrap());
        match loaded.payload() {
            Payload::Organization(o) => assert_eq!(o.name, "Acme, Inc."),
            other => panic!("wrong payload: {:?}", other),
        }
    }

    #[test]
    fn test_full_update() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Text(Text::new("first")));
        let id = node.init();
        store(&conn, &mut node).unwrap();

        if let Payload::Text(t) = node.payload_mut().unwrap() {
            t.text = "second".into();
        }

        update(&conn, &node).unwrap();

        let mut loaded = Node::blank(Kind::Text, id);
        assert!(load(&conn, &mut loaded).unwrap());
        match loaded.payload() {
            Payload::Text(t) => assert_eq!(t.text, "second"),
            other => panic!("wrong payload: {:?}", other),
        }
    }

    #[test]
    fn test_clean_node_skips_kind_row() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Text(Text::new("original")));
        let id = node.init();
        store(&conn, &mut node).unwrap();
        assert!(!node.is_changed());

        // Tamper with the scalar while leaving the node clean. A clean
        // node still gets its edges rewritten, but not its kind row.
        let ghost = NodeId::generate();
        if let Payload::Text(t) = node.payload_raw_mut() {
            t.text = "tampered".into();
        }
        node.add_down(ghost);
        node.set_changed(false);

        store(&conn, &mut node).unwrap();

        let stored: String = conn
            .query_row("SELECT text FROM text WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(stored, "original");
        assert_eq!(
            edges(&conn, id).unwrap(),
            vec![(ghost, Direction::Down)]
        );
    }

    #[test]
    fn test_timestamps_round_trip() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Todo(Todo {
            description: "ship it".into(),
            completed: true,
            spawned_from: Some(NodeId::generate()),
            ..Todo::default()
        }));
        let id = node.init();

        let (created, spawned_from) = match node.payload() {
            Payload::Todo(t) => (t.created, t.spawned_from),
            _ => unreachable!(),
        };

        store(&conn, &mut node).unwrap();

        let mut loaded = Node::blank(Kind::Todo, id);
        assert!(load(&conn, &mut loaded).unwrap());

        match loaded.payload() {
            Payload::Todo(t) => {
                assert_eq!(t.description, "ship it");
                assert_eq!(t.created, created);
                assert_eq!(t.spawned_from, spawned_from);
                assert!(t.completed);
                assert_eq!(t.due, None);
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }

    #[test]
    fn test_address_lines_column() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let head = NodeId::generate();

        let mut node = Node::new(Payload::UsAddress(UsAddress {
            city: "Springfield".into(),
            state: "OR".into(),
            zipcode: "97477".into(),
            address_lines: Some(head),
        }));
        let id = node.init();

        store(&conn, &mut node).unwrap();

        let stored: String = conn
            .query_row(
                "SELECT address_lines FROM us_address WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, head.to_string());

        let mut loaded = Node::blank(Kind::UsAddress, id);
        assert!(load(&conn, &mut loaded).unwrap());
        assert_eq!(loaded.payload().address_lines(), Some(head));
    }

    #[test]
    fn test_remove_scrubs_everything() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Text(Text::new("doomed")));
        let id = node.init();

        let mut other = Node::new(Payload::Text(Text::new("survivor")));
        let other_id = other.init();

        node.add_down(other_id);
        other.add_up(id);

        store(&conn, &mut node).unwrap();
        store(&conn, &mut other).unwrap();

        remove(&conn, &node).unwrap();

        assert!(!node_exists(&conn, id).unwrap());
        assert!(!kind_exists(&conn, Kind::Text, id).unwrap());
        assert!(edges(&conn, id).unwrap().is_empty());

        // Edges pointing *at* the removed node are gone too.
        assert!(edges(&conn, other_id).unwrap().is_empty());
        assert!(node_exists(&conn, other_id).unwrap());
    }

    #[test]
    fn test_remove_by_id() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Text(Text::new("gone")));
        let id = node.init();
        store(&conn, &mut node).unwrap();

        remove_by_id(&conn, id).unwrap();
        assert!(!node_exists(&conn, id).unwrap());

        // Absent identifiers are a no-op.
        remove_by_id(&conn, NodeId::generate()).unwrap();
    }

    #[test]
    fn test_unknown_kind() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let err = kind_for("HoloDeck").unwrap_err();
        assert!(err.downcast_ref::<UnknownKind>().is_some());

        // A stored row with an out-of-registry kind name poisons removal.
        let id = NodeId::generate();
        conn.execute(
            "INSERT INTO node (id, kind_name) VALUES (?1, ?2)",
            params![id, "HoloDeck"],
        )
        .unwrap();

        let err = remove_by_id(&conn, id).unwrap_err();
        assert!(err.downcast_ref::<UnknownKind>().is_some());
    }

    #[test]
    fn test_neutral_kind_base_tables_only() {
        let (_dir, db) = scratch();
        let conn = db.connect().unwrap();

        let mut node = Node::new(Payload::Node);
        let id = node.init();
        node.add_down(NodeId::generate());

        store(&conn, &mut node).unwrap();

        assert_eq!(node_kind(&conn, id).unwrap().as_deref(), Some("Node"));
        assert_eq!(edges(&conn, id).unwrap().len(), 1);
    }
}
