mod cli;
mod codec;
mod config;
mod dependency;
mod error;
mod ident;
mod library;
mod logfile;
mod manager;
mod portal;
mod property_tree;
mod resolver;
mod save;
mod version;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
