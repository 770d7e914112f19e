//! sakura entry point.

fn main() {
    env_logger::init();
    if let Err(err) = sakura::cli::run_cli() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
