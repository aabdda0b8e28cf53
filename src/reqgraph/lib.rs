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

pub mod archive;
pub mod client;
pub mod error;
pub mod factory;
pub mod node;
pub mod pool;
pub mod save;
pub mod server;
pub mod store;

pub use crate::client::{Client, FetchEvent};
pub use crate::error::{Error, ResultExt};
pub use crate::factory::{load_graph, LoadEvent, LoadTracker};
pub use crate::node::{Graph, Kind, Node, NodeId, Payload, SharedNode};
pub use crate::pool::{Pool, Queue, Task};
pub use crate::save::{save, save_single, SaveEvent, SaveTracker};
pub use crate::server::Server;
pub use crate::store::Db;
