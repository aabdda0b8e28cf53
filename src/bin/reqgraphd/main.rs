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
mod opts;

use std::process::exit;

use log::error;
use structopt::StructOpt;

use reqgraph::{Db, Error, Server};

use crate::opts::Opts;

fn run(opts: Opts) -> Result<(), Error> {
    let db = Db::new(&opts.db);
    db.ensure_schema()?;

    let pool_threads = if opts.pool_threads == 0 {
        num_cpus::get()
    } else {
        opts.pool_threads
    };

    let server = Server::start(
        (opts.address.as_str(), opts.port),
        opts.endpoint_threads,
        pool_threads,
        db,
    )?;

    server.join();

    Ok(())
}

fn main() {
    pretty_env_logger::init();

    if let Err(err) = run(Opts::from_args()) {
        error!("{}", err);

        for cause in err.iter_causes() {
            error!("caused by: {}", cause);
        }

        exit(1);
    }
}
