//! Test missing linkage field error.

use classbridge::NativeClass;

#[derive(NativeClass)]
#[bridge(name = "app.Orphan")]
struct Orphan {
    label: String,
}

fn main() {}
