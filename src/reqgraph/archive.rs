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

//! Graph documents. A document is the reachable closure from a root,
//! written depth-first. Every record is keyed by its kind name so that
//! ingestion can dispatch without a schema:
//!
//! ```json
//! { "Organization": { "id": "...", "locked": false, "name": "...",
//!                     "upList": [], "downList": [ ... ] } }
//! ```
//!
//! The first occurrence of an identifier carries the full record; later
//! occurrences are written as `{ "ref": "<id>" }`. Ingestion resolves
//! references through the arena, so shared neighbors and cycles come back
//! as one instance.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use crate::error::{Deserialization, Error};
use crate::node::{Graph, Kind, NodeId, Payload};

/// Structural properties of a record; everything else is a scalar field of
/// the payload.
const RESERVED: &[&str] = &[
    "id",
    "upList",
    "downList",
    "committed",
    "changeParent",
    "changeChild",
    "addressLines",
    "ref",
];

/// Serializes the closure reachable from `root` into a single document.
pub fn to_value(graph: &Graph, root: NodeId) -> Value {
    let mut seen = HashSet::new();
    emit(graph, root, &mut seen)
}

pub fn to_string(graph: &Graph, root: NodeId) -> Result<String, Error> {
    Ok(serde_json::to_string(&to_value(graph, root))?)
}

fn emit(graph: &Graph, id: NodeId, seen: &mut HashSet<NodeId>) -> Value {
    if !seen.insert(id) {
        return json!({ "ref": id.to_string() });
    }

    let shared = match graph.node(id) {
        Some(shared) => shared,
        // Dangling links degrade to references; the other side may live in
        // another store.
        None => return json!({ "ref": id.to_string() }),
    };

    let node = shared.lock().unwrap();

    let mut record = match node.payload().to_scalars() {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    record.insert("id".into(), json!(node.id_string()));

    let up: Vec<Value> = node
        .up()
        .iter()
        .map(|neighbor| emit(graph, *neighbor, seen))
        .collect();
    record.insert("upList".into(), Value::Array(up));

    let down: Vec<Value> = node
        .down()
        .iter()
        .map(|neighbor| emit(graph, *neighbor, seen))
        .collect();
    record.insert("downList".into(), Value::Array(down));

    if let Some(commit) = node.payload().commit() {
        record.insert("committed".into(), json!(commit.committed));

        if let Some(parent) = commit.change_parent {
            record.insert("changeParent".into(), emit(graph, parent, seen));
        }

        if let Some(child) = commit.change_child {
            record.insert("changeChild".into(), emit(graph, child, seen));
        }
    }

    if let Some(head) = node.payload().address_lines() {
        record.insert("addressLines".into(), emit(graph, head, seen));
    }

    let mut wrapper = Map::new();
    wrapper.insert(node.kind_name().into(), Value::Object(record));
    Value::Object(wrapper)
}

/// Reconstructs a graph from a document. Returns the arena and the root
/// identifier. Unknown kind names come back as neutral nodes with identity
/// and edges intact.
pub fn from_value(value: &Value) -> Result<(Graph, NodeId), Error> {
    let graph = Graph::new();
    let root = ingest(&graph, value)?;
    Ok((graph, root))
}

pub fn from_str(s: &str) -> Result<(Graph, NodeId), Error> {
    let value: Value = serde_json::from_str(s)
        .map_err(|err| Deserialization::new(err.to_string()))?;
    from_value(&value)
}

fn parse_id(s: &str) -> Result<NodeId, Error> {
    s.parse().map_err(|_| {
        Error::from(Deserialization::new(format!("bad identifier '{}'", s)))
    })
}

fn ingest(graph: &Graph, value: &Value) -> Result<NodeId, Error> {
    let obj = value
        .as_object()
        .ok_or_else(|| Deserialization::new("expected a record object"))?;

    // A back (or forward) reference to a record elsewhere in the document.
    if let Some(reference) = obj.get("ref") {
        let s = reference
            .as_str()
            .ok_or_else(|| Deserialization::new("'ref' must be a string"))?;
        let id = parse_id(s)?;

        // Forward references allocate a placeholder; the full record fills
        // it in when it arrives.
        graph.entry(id, Kind::Node);
        return Ok(id);
    }

    if obj.len() != 1 {
        return Err(
            Deserialization::new("expected a single kind property").into()
        );
    }

    let (name, body) = obj.iter().next().unwrap();
    let body = body
        .as_object()
        .ok_or_else(|| Deserialization::new("record body must be an object"))?;

    let kind = Kind::from_name(name).unwrap_or(Kind::Node);

    let id = body
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| Deserialization::new("record is missing 'id'"))?;
    let id = parse_id(id)?;

    let (shared, _) = graph.entry(id, kind);

    let mut scalars = body.clone();
    for key in RESERVED {
        scalars.remove(*key);
    }

    let payload = Payload::from_scalars(kind, Value::Object(scalars))
        .map_err(|err| Deserialization::new(err.to_string()))?;

    {
        let mut node = shared.lock().unwrap();
        *node.payload_raw_mut() = payload;
        node.set_changed(true);
    }

    // Neighbors are ingested before they are linked so that the lock on
    // this node is never held across a child's ingestion.
    let mut up = Vec::new();
    if let Some(list) = body.get("upList") {
        for entry in require_array(list, "upList")? {
            up.push(ingest(graph, entry)?);
        }
    }

    let mut down = Vec::new();
    if let Some(list) = body.get("downList") {
        for entry in require_array(list, "downList")? {
            down.push(ingest(graph, entry)?);
        }
    }

    let committed = body.get("committed").and_then(Value::as_bool);

    let change_parent = match body.get("changeParent") {
        Some(entry) => Some(ingest(graph, entry)?),
        None => None,
    };

    let change_child = match body.get("changeChild") {
        Some(entry) => Some(ingest(graph, entry)?),
        None => None,
    };

    let address_lines = match body.get("addressLines") {
        Some(entry) => Some(ingest(graph, entry)?),
        None => None,
    };

    {
        let mut node = shared.lock().unwrap();

        for neighbor in up {
            node.add_up(neighbor);
        }

        for neighbor in down {
            node.add_down(neighbor);
        }

        if let Some(commit) = node.payload_raw_mut().commit_mut() {
            commit.committed = committed.unwrap_or(false);
            commit.change_parent = change_parent;
            commit.change_child = change_child;
        }

        if address_lines.is_some() {
            node.payload_raw_mut().set_address_lines(address_lines);
        }

        node.set_changed(true);
    }

    Ok(id)
}

fn require_array<'a>(
    value: &'a Value,
    what: &str,
) -> Result<&'a Vec<Value>, Error> {
    value.as_array().ok_or_else(|| {
        Error::from(Deserialization::new(format!("'{}' must be an array", what)))
    })
}
