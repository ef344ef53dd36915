fn main() {
    if let Err(err) = markstat::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
