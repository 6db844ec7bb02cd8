//! Test unknown field attribute error.

use classbridge::{Linkage, NativeClass};

#[derive(NativeClass)]
struct Strange {
    #[bridge(weak)]
    linkage: Linkage,
}

fn main() {}
