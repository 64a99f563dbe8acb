fn main() {
    if let Err(err) = csv_inserts::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
