//! Test one field marked as both linkage and base error.

use classbridge::{Linkage, NativeClass};

#[derive(NativeClass)]
struct Confused {
    #[bridge(linkage, base)]
    link: Linkage,
}

fn main() {}
