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

//! All fallible operations in this crate return `failure::Error`. The types
//! here are the domain-specific failures that callers are expected to
//! distinguish; everything else (I/O, SQL, HTTP) is attached as context.

use std::fmt;

use failure::Fail;

pub use failure::{Error, ResultExt};

/// A mutation was attempted on a node that has been committed. Committed
/// nodes are frozen; changes must go through a change node instead.
#[derive(Fail, Debug, Clone, Eq, PartialEq)]
pub struct NotChanged {
    kind: &'static str,
}

impl NotChanged {
    pub fn new(kind: &'static str) -> NotChanged {
        NotChanged { kind }
    }
}

impl fmt::Display for NotChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot modify committed {} node", self.kind)
    }
}

/// `discard_change` was called on a node whose change child has itself been
/// committed. A committed change node is part of the record and cannot be
/// thrown away.
#[derive(Fail, Debug, Clone, Eq, PartialEq)]
pub struct NotDiscarded {
    kind: &'static str,
}

impl NotDiscarded {
    pub fn new(kind: &'static str) -> NotDiscarded {
        NotDiscarded { kind }
    }
}

impl fmt::Display for NotDiscarded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change node of {} is committed and cannot be discarded", self.kind)
    }
}

/// A store codec was requested for a kind name that is not in the registry.
#[derive(Fail, Debug, Clone, Eq, PartialEq)]
pub struct UnknownKind {
    name: String,
}

impl UnknownKind {
    pub fn new<S: Into<String>>(name: S) -> UnknownKind {
        UnknownKind { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node kind '{}'", self.name)
    }
}

/// A graph document could not be parsed or has an incompatible shape.
#[derive(Fail, Debug, Clone, Eq, PartialEq)]
pub struct Deserialization {
    reason: String,
}

impl Deserialization {
    pub fn new<S: Into<String>>(reason: S) -> Deserialization {
        Deserialization {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Deserialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to deserialize graph: {}", self.reason)
    }
}

/// The requested graph root does not exist in the store.
#[derive(Fail, Debug, Clone, Eq, PartialEq)]
pub struct NotFound {
    id: String,
}

impl NotFound {
    pub fn new<S: Into<String>>(id: S) -> NotFound {
        NotFound { id: id.into() }
    }
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no graph with root '{}'", self.id)
    }
}

/// A remote store request failed, either on the wire or with a non-success
/// status.
#[derive(Fail, Debug, Clone, Eq, PartialEq)]
pub struct Transport {
    message: String,
}

impl Transport {
    pub fn new<S: Into<String>>(message: S) -> Transport {
        Transport {
            message: message.into(),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport failure: {}", self.message)
    }
}
