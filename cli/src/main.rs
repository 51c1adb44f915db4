/*
    This file is part of Stubify.

    Stubify is free software: you can redistribute it and/or modify
    it under the terms of the GNU Lesser General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    Stubify is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with Stubify. (LICENSE.md)  If not, see <https://www.gnu.org/licenses/>.
*/
//! `stubify --input app.jar --output stubs/app.jar`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use stubify::archive::{stubify_archive, ArchiveOptions};
use stubify::stub::RUNTIME_EXCEPTION;
use stubify::Stubber;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stubify")]
#[command(about = "Replaces every method body in a jar with `throw new RuntimeException()`")]
#[command(version)]
struct Cli {
    /// Input jar or zip archive
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Output archive, replaced if it exists
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Store entries uncompressed instead of deflating them
    #[arg(short, long)]
    store: bool,

    /// Internal name of the exception stubbed methods throw
    #[arg(short, long, value_name = "CLASS", default_value = RUNTIME_EXCEPTION)]
    exception: String,

    /// Number of worker threads
    #[arg(short, long)]
    threads: Option<usize>,

    /// Leave out every entry that is not a class
    #[arg(long)]
    skip_resources: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Input: {}", cli.input.display());
    info!("Output: {}", cli.output.display());
    info!("Store: {}", cli.store);

    let options = ArchiveOptions {
        store: cli.store,
        skip_resources: cli.skip_resources,
        threads: cli.threads,
        stubber: Stubber::new(cli.exception),
    };
    stubify_archive(&cli.input, &cli.output, &options)
        .with_context(|| format!("failed to stub {}", cli.input.display()))?;
    Ok(())
}
