// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("flappy")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Flappy Contributors")
        .about("Package manager for FlucidOS")
        .subcommand_required(false)
        .arg(
            Arg::new("log_file")
                .long("log-file")
                .value_name("PATH")
                .global(true)
                .help("Append log output to this file instead of stderr"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Validate package archives and show their metadata")
                .arg(
                    Arg::new("archives")
                        .value_name("ARCHIVE")
                        .required(true)
                        .num_args(1..)
                        .help("Paths to package archives (tar, optionally gzip/xz/zstd compressed)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print one JSON object per archive"),
                )
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Reject unknown .PKGINFO keys instead of ignoring them"),
                ),
        )
        .subcommand(Command::new("version").about("Show Flappy version"))
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("flappy.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
