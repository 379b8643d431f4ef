use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

// cli.rs only depends on clap and clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
#[allow(dead_code)]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR").map(PathBuf::from) else {
        panic!("OUT_DIR is set by cargo for build scripts");
    };
    let man_dir = out_dir.join("man");
    if let Err(e) = fs::create_dir_all(&man_dir) {
        panic!("cannot create {}: {e}", man_dir.display());
    }

    write_pages(&cli::Cli::command(), &man_dir);
}

/// One page per command, named `obdx-slots-list.1` and so on.
fn write_pages(cmd: &clap::Command, dir: &Path) {
    let name = cmd.get_name().to_owned();
    let path = dir.join(format!("{name}.1"));

    let mut page = Vec::new();
    if let Err(e) = clap_mangen::Man::new(cmd.clone()).render(&mut page) {
        panic!("cannot render man page for `{name}`: {e}");
    }
    if let Err(e) = fs::write(&path, page) {
        panic!("cannot write {}: {e}", path.display());
    }

    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let sub = sub.clone().name(format!("{name}-{}", sub.get_name()));
        write_pages(&sub, dir);
    }
}
