fn main() {
    if let Err(err) = pathmap_converter::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
