use clap::Parser;
use phpgrep_cli::cli::Opts;
use phpgrep_cli::program;

const EXIT_MATCHED: i32 = 0;
const EXIT_NOT_MATCHED: i32 = 1;
const EXIT_ERROR: i32 = 2;

fn main() {
    let opts = Opts::parse();
    phpgrep_cli::init_logging(opts.verbose);

    match program::run(opts) {
        Ok(true) => std::process::exit(EXIT_MATCHED),
        Ok(false) => std::process::exit(EXIT_NOT_MATCHED),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
