fn main() {
    if let Err(err) = statsheet::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
