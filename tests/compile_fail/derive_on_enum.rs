//! Test deriving on a non-struct error.

use classbridge::NativeClass;

#[derive(NativeClass)]
enum Mode {
    On,
    Off,
}

fn main() {}
