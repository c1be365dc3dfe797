//! Renders the `downlink(1)` manual page from the clap definition in
//! `src/cli.rs`.

use std::{fs, path::Path};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

/// Files the generated page depends on. `cli.rs` may only use `clap` and
/// `std`, so nothing outside this list can change the output.
const INPUTS: &[&str] = &["build.rs", "src/cli.rs"];

const MAN_DIR: &str = "target/generated-man";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for input in INPUTS {
        println!("cargo:rerun-if-changed={input}");
    }

    let mut page = Vec::new();
    Man::new(cli::Cli::command()).render(&mut page)?;

    let dir = Path::new(MAN_DIR);
    fs::create_dir_all(dir)?;
    fs::write(dir.join("downlink.1"), page)?;
    Ok(())
}
