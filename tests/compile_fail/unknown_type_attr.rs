//! Test unknown type attribute error.

use classbridge::{Linkage, NativeClass};

#[derive(NativeClass)]
#[bridge(namespace = "app")]
struct Strange {
    linkage: Linkage,
}

fn main() {}
