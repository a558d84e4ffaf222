fn main() -> std::process::ExitCode {
    rotorwire_lib::run()
}
