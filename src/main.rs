fn main() -> std::io::Result<()> {
    emailprep_lib::run()
}
