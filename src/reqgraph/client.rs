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

//! A client for a remote graph server. Fetches surface their outcome on a
//! subscriber channel: either the graph became available or an error
//! message, never both. Transport problems and malformed documents take the
//! same error path; there is no automatic retry.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::archive;
use crate::error::{Error, NotFound, Transport};
use crate::node::{Graph, NodeId, ServerLocatorNode};

/// The outcome of a fetch.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// The graph was fetched and deserialized.
    Available(Arc<Graph>, NodeId),

    /// The fetch failed on the wire, with a non-success status, or while
    /// deserializing.
    Error(String),
}

pub struct Client {
    http: reqwest::blocking::Client,
}

impl Default for Client {
    fn default() -> Client {
        Client::new()
    }
}

impl Client {
    pub fn new() -> Client {
        Client {
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetches the graph at `url` and reports to the subscriber.
    pub fn fetch(&self, url: &str, subscriber: &Sender<FetchEvent>) {
        let event = match self.try_fetch(url) {
            Ok((graph, root)) => {
                FetchEvent::Available(Arc::new(graph), root)
            }
            Err(err) => FetchEvent::Error(err.to_string()),
        };

        let _ = subscriber.send(event);
    }

    fn try_fetch(&self, url: &str) -> Result<(Graph, NodeId), Error> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|err| Transport::new(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(NotFound::new(url).into());
        }

        if !status.is_success() {
            return Err(
                Transport::new(format!("{} for {}", status, url)).into()
            );
        }

        let body = response
            .text()
            .map_err(|err| Transport::new(err.to_string()))?;

        archive::from_str(&body)
    }

    /// The locator records a server advertises under `/graphs`.
    pub fn graphs(
        &self,
        base: &str,
    ) -> Result<Vec<ServerLocatorNode>, Error> {
        let url = format!("{}/graphs", base);

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|err| Transport::new(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                Transport::new(format!("{} for {}", status, url)).into()
            );
        }

        response
            .json()
            .map_err(|err| Transport::new(err.to_string()).into())
    }

    /// Pushes the closure reachable from `root` to the server. The server
    /// acknowledges as soon as the save is scheduled.
    pub fn store(
        &self,
        base: &str,
        graph: &Graph,
        root: NodeId,
    ) -> Result<(), Error> {
        let url = format!("{}/graph/{}", base, root);
        let body = archive::to_string(graph, root)?;

        let response = self
            .http
            .post(&url)
            .body(body)
            .send()
            .map_err(|err| Transport::new(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(
                Transport::new(format!("{} for {}", status, url)).into()
            );
        }

        Ok(())
    }
}
