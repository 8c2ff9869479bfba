fn main() {
    if let Err(err) = review_charts::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
