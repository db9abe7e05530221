fn main() {
    std::process::exit(pagerace::cli::run());
}
