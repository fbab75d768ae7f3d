//! phrasegen CLI binary
//!
//! Minimal entrypoint; all logic lives in the library and cli::run()
//! handles all output including errors.

fn main() {
    if let Err(e) = phrasegen::cli::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
