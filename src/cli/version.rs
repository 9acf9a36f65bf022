//! Display version information.

pub fn execute() {
    println!("statusbot {}", env!("CARGO_PKG_VERSION"));
}
