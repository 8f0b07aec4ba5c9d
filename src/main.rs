fn main() {
    astigmatism_calibration::cli::run();
}
