//! 全切片图像实验程序.

mod args;
mod cmds;
mod report;

use clap::Parser;

fn main() {
    let cli = args::Cli::parse();
    utils::init_logger(cli.verbose);
    if let Err(e) = cli.run_program() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
