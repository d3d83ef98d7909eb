// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use structopt::StructOpt;

/// The command line arguments of the node.
#[derive(Clone, Debug, StructOpt)]
pub struct CliArgs {
    /// Path of the configuration file.
    #[structopt(short = "c", long = "config", default_value = "config.toml")]
    pub config: String,

    /// Force a database revalidation even when the last shutdown was clean.
    #[structopt(long = "revalidate")]
    pub revalidate: bool,

    /// Print the version and exit.
    #[structopt(short = "v", long = "version")]
    pub version: bool,
}

impl CliArgs {
    /// Parses the arguments from the process environment.
    pub fn new() -> Self {
        Self::from_args()
    }
}
