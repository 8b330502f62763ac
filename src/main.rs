use clap::{Parser, error::ErrorKind};

use full_length_chopper::args::{Cli, abort_clap};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = full_length_chopper::run(cli) {
        abort_clap(ErrorKind::Io, err);
    }
}
