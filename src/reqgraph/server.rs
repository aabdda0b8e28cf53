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

//! The REST surface. Three endpoints on top of the store:
//!
//!  * `GET /graphs` lists the available graphs as locator records.
//!  * `GET /graph/:id` loads the whole graph rooted at `:id` and returns it
//!    as a single document. Blocking: the handler waits on the factory.
//!  * `POST /graph/:id` ingests a document and schedules a closure save.
//!    Fire-and-forget: the response does not wait for the disk.
//!
//! Accept threads share one listener; durable work runs on the worker pool.

use std::io::Read;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use failure::err_msg;
use log::{debug, error, info};
use tiny_http::{Header, Method, Request, Response};

use crate::archive;
use crate::error::Error;
use crate::factory;
use crate::node::{NodeId, ServerLocatorNode};
use crate::pool::{Pool, Queue};
use crate::save;
use crate::store::Db;

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Server {
    http: Arc<tiny_http::Server>,
    running: Arc<AtomicBool>,
    pool: Pool,
    endpoints: Vec<JoinHandle<()>>,
    addr: SocketAddr,
}

impl Server {
    /// Binds the listener and spawns `endpoint_threads` accept threads plus
    /// a worker pool of `pool_threads`.
    pub fn start<A: ToSocketAddrs>(
        addr: A,
        endpoint_threads: usize,
        pool_threads: usize,
        db: Db,
    ) -> Result<Server, Error> {
        let http = tiny_http::Server::http(addr)
            .map_err(|err| err_msg(err.to_string()))?;

        let addr = http
            .server_addr()
            .to_ip()
            .ok_or_else(|| err_msg("server is not listening on an IP address"))?;

        let http = Arc::new(http);
        let running = Arc::new(AtomicBool::new(true));
        let pool = Pool::new(pool_threads);

        let endpoints = (0..endpoint_threads.max(1))
            .map(|i| {
                let http = http.clone();
                let running = running.clone();
                let db = db.clone();
                let queue = pool.queue();

                thread::spawn(move || endpoint(i, &http, &running, &db, &queue))
            })
            .collect();

        info!("listening on {}", addr);

        Ok(Server {
            http,
            running,
            pool,
            endpoints,
            addr,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stops the accept threads, drains the worker pool, and joins both.
    /// Requests in flight complete; new ones are no longer picked up.
    pub fn shutdown(self) {
        let Server {
            http,
            running,
            pool,
            endpoints,
            addr,
        } = self;

        info!("shutting down {}", addr);

        // The accept threads go first: anything they have already enqueued
        // still drains, and nothing new can land on a dead queue.
        running.store(false, Ordering::SeqCst);

        for endpoint in endpoints {
            let _ = endpoint.join();
        }

        pool.shutdown();
        pool.join();

        drop(http);
    }

    /// Blocks the caller until the accept threads exit. For running as a
    /// foreground process.
    pub fn join(self) {
        for endpoint in self.endpoints {
            let _ = endpoint.join();
        }
    }
}

fn endpoint(
    id: usize,
    http: &tiny_http::Server,
    running: &AtomicBool,
    db: &Db,
    queue: &Queue,
) {
    debug!("endpoint thread {} starting", id);

    while running.load(Ordering::SeqCst) {
        let request = match http.recv_timeout(RECV_TIMEOUT) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(err) => {
                error!("endpoint thread {}: {}", id, err);
                break;
            }
        };

        handle(request, db, queue);
    }

    debug!("endpoint thread {} exiting", id);
}

fn json_header() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap()
}

fn respond(request: Request, response: Response<std::io::Cursor<Vec<u8>>>) {
    if let Err(err) = request.respond(response) {
        error!("failed to respond: {}", err);
    }
}

fn handle(mut request: Request, db: &Db, queue: &Queue) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("");

    debug!("{} {}", method, path);

    match (&method, path) {
        (&Method::Get, "/graphs") => match list_graphs(&request, db) {
            Ok(body) => respond(
                request,
                Response::from_string(body).with_header(json_header()),
            ),
            Err(err) => {
                error!("listing graphs failed: {}", err);
                respond(
                    request,
                    Response::from_string("Internal Server Error")
                        .with_status_code(500),
                );
            }
        },

        (&Method::Get, path) if path.starts_with("/graph/") => {
            let id = &path["/graph/".len()..];
            get_graph(request, id, db, queue);
        }

        (&Method::Post, path) if path.starts_with("/graph/") => {
            let mut body = String::new();
            if request.as_reader().read_to_string(&mut body).is_err() {
                respond(
                    request,
                    Response::from_string("Bad Request").with_status_code(400),
                );
                return;
            }

            post_graph(request, &body, db, queue);
        }

        _ => respond(
            request,
            Response::from_string("Not Found").with_status_code(404),
        ),
    }
}

/// Synthesizes locator records from the `graph_node` projection. The
/// address is rebuilt from the request so it survives reverse proxies.
fn list_graphs(request: &Request, db: &Db) -> Result<String, Error> {
    let scheme = header_value(request, "X-Forwarded-Proto")
        .unwrap_or_else(|| "http".to_string());
    let host = header_value(request, "Host").ok_or_else(|| {
        err_msg("request is missing a Host header")
    })?;

    let conn = db.connect()?;
    let mut stmt = conn.prepare(
        "SELECT id, title FROM graph_node ORDER BY rowid",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, NodeId>(0)?, row.get::<_, Option<String>>(1)?))
    })?;

    let mut locators = Vec::new();
    for row in rows {
        let (id, title) = row?;
        locators.push(ServerLocatorNode {
            graph_uuid: id.to_string(),
            graph_title: title.unwrap_or_default(),
            graph_address: format!("{}://{}/graph/{}", scheme, host, id),
        });
    }

    Ok(serde_json::to_string(&locators)?)
}

fn header_value(request: &Request, field: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(field))
        .map(|header| header.value.as_str().to_string())
}

fn get_graph(request: Request, id: &str, db: &Db, queue: &Queue) {
    if id.is_empty() {
        respond(
            request,
            Response::from_string("Bad Request").with_status_code(400),
        );
        return;
    }

    let id: NodeId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            respond(
                request,
                Response::from_string("Bad Request").with_status_code(400),
            );
            return;
        }
    };

    let (graph, tracker, _events) = factory::load_graph(db, id, queue);

    // Block this endpoint thread until the factory reports done.
    match tracker.wait() {
        Ok(Some(root)) => match archive::to_string(&graph, root) {
            Ok(body) => respond(
                request,
                Response::from_string(body).with_header(json_header()),
            ),
            Err(err) => {
                error!("serializing graph {} failed: {}", root, err);
                respond(
                    request,
                    Response::from_string("Internal Server Error")
                        .with_status_code(500),
                );
            }
        },
        Ok(None) => respond(
            request,
            Response::from_string("Not Found").with_status_code(404),
        ),
        Err(err) => {
            error!("loading graph {} failed: {}", id, err);
            respond(
                request,
                Response::from_string("Internal Server Error")
                    .with_status_code(500),
            );
        }
    }
}

fn post_graph(request: Request, body: &str, db: &Db, queue: &Queue) {
    let (graph, root) = match archive::from_str(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!("rejecting graph document: {}", err);
            respond(
                request,
                Response::from_string("Bad Request").with_status_code(400),
            );
            return;
        }
    };

    // Fire and forget: the save tree runs on the pool after we respond.
    let graph = Arc::new(graph);
    let _ = save::save(db, &graph, root, queue);

    respond(request, Response::from_string("OK"));
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread::sleep;

    use crate::node::{
        Graph, GraphNode, Payload, Project, Requirement,
    };
    use crate::store::tests::scratch;

    fn start(db: &Db) -> Server {
        Server::start("127.0.0.1:0", 2, 4, db.clone()).unwrap()
    }

    #[test]
    fn test_post_then_get() {
        let (_dir, db) = scratch();
        let server = start(&db);
        let base = format!("http://127.0.0.1:{}", server.port());

        let graph = Graph::new();
        let (root, _) = graph.add(Payload::GraphNode(GraphNode::new(
            "Engineering",
        )));
        let (project, _) =
            graph.add(Payload::Project(Project::new("Engineer")));
        let (req, _) = graph.add(Payload::Requirement(Requirement::new(
            "Must be software",
        )));

        graph.connect(root, project).unwrap();
        graph.connect(project, req).unwrap();

        let doc = archive::to_string(&graph, root).unwrap();

        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&format!("{}/graph/{}", base, root))
            .body(doc)
            .send()
            .unwrap();
        assert!(response.status().is_success());

        // The save is asynchronous; poll until the graph comes back.
        let mut fetched = None;
        for _ in 0..100 {
            let response = reqwest::blocking::get(&format!(
                "{}/graph/{}",
                base, root
            ))
            .unwrap();

            if response.status().is_success() {
                fetched = Some(response.text().unwrap());
                break;
            }

            sleep(Duration::from_millis(50));
        }

        let doc = fetched.expect("graph never became fetchable");
        let (loaded, loaded_root) = archive::from_str(&doc).unwrap();

        assert_eq!(loaded_root, root);

        let node = loaded.node(root).unwrap();
        let node = node.lock().unwrap();
        assert_eq!(node.down(), &[project]);

        server.shutdown();
    }

    #[test]
    fn test_list_graphs() {
        let (_dir, db) = scratch();
        let server = start(&db);
        let base = format!("http://127.0.0.1:{}", server.port());

        let graph = Graph::new();
        let (root, _) = graph.add(Payload::GraphNode(GraphNode::new(
            "Engineering",
        )));

        let doc = archive::to_string(&graph, root).unwrap();
        let client = reqwest::blocking::Client::new();
        client
            .post(&format!("{}/graph/{}", base, root))
            .body(doc)
            .send()
            .unwrap();

        let mut locators: Vec<ServerLocatorNode> = Vec::new();
        for _ in 0..100 {
            let response =
                reqwest::blocking::get(&format!("{}/graphs", base)).unwrap();
            locators = response.json().unwrap();

            if !locators.is_empty() {
                break;
            }

            sleep(Duration::from_millis(50));
        }

        assert_eq!(locators.len(), 1);
        assert_eq!(locators[0].graph_uuid, root.to_string());
        assert_eq!(locators[0].graph_title, "Engineering");
        assert_eq!(
            locators[0].graph_address,
            format!("{}/graph/{}", base, root)
        );

        server.shutdown();
    }

    #[test]
    fn test_missing_and_malformed() {
        let (_dir, db) = scratch();
        let server = start(&db);
        let base = format!("http://127.0.0.1:{}", server.port());

        // Unknown root.
        let response = reqwest::blocking::get(&format!(
            "{}/graph/{}",
            base,
            NodeId::generate()
        ))
        .unwrap();
        assert_eq!(response.status().as_u16(), 404);

        // Not a UUID at all.
        let response =
            reqwest::blocking::get(&format!("{}/graph/junk", base)).unwrap();
        assert_eq!(response.status().as_u16(), 400);

        // A body that does not deserialize.
        let client = reqwest::blocking::Client::new();
        let response = client
            .post(&format!("{}/graph/{}", base, NodeId::generate()))
            .body("{not a graph}")
            .send()
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);

        server.shutdown();
    }
}
