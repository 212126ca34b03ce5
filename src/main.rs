fn main() {
    if let Err(err) = canvasflow::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
