//! Test two fields marked as linkage error.

use classbridge::{Linkage, NativeClass};

#[derive(NativeClass)]
struct Twice {
    #[bridge(linkage)]
    first: Linkage,
    #[bridge(linkage)]
    second: Linkage,
}

fn main() {}
