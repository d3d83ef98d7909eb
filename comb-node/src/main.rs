// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use comb_node::{cli::CliArgs, config::NodeConfigBuilder, node, Error};
use fern_logger::logger_init;
use log::error;

fn main() {
    let args = CliArgs::new();

    if args.version {
        println!("comb {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = start(args) {
        // The logger may not be up yet; print to both.
        eprintln!("comb failed: {}", e);
        error!("Node failed: {}.", e);
        std::process::exit(1);
    }
}

fn start(args: CliArgs) -> Result<(), Error> {
    let config = NodeConfigBuilder::from_file(&args.config)?.finish()?;

    logger_init(config.logger.clone())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(node::run(config, args.revalidate))
}
