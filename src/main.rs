fn main() {
    if let Err(e) = areacast_lib::run() {
        log::error!("{}", e);
        eprintln!("areacast: {}", e);
        std::process::exit(1);
    }
}
