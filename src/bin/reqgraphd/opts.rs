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
use std::path::PathBuf;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub struct Opts {
    /// The port to listen on.
    #[structopt(short = "p", long = "port", default_value = "8080")]
    pub port: u16,

    /// The address to bind to.
    #[structopt(short = "a", long = "address", default_value = "127.0.0.1")]
    pub address: String,

    /// Path to the graph database.
    #[structopt(long = "db", parse(from_os_str), default_value = "reqgraph.db")]
    pub db: PathBuf,

    /// The number of HTTP endpoint threads. Defaults to 2.
    #[structopt(long = "endpoint-threads", default_value = "2")]
    pub endpoint_threads: usize,

    /// The number of worker threads. Defaults to the number of logical
    /// cores.
    #[structopt(long = "pool-threads", default_value = "0")]
    pub pool_threads: usize,
}
