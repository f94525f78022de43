fn main() {
    errdata::cli::run();
}
