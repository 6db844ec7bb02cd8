//! Test empty class name error.

use classbridge::{Linkage, NativeClass};

#[derive(NativeClass)]
#[bridge(name = "")]
struct Nameless {
    linkage: Linkage,
}

fn main() {}
