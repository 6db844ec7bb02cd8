//! Test two fields marked as base error.

use std::sync::Arc;

use classbridge::{Linkage, NativeClass};

#[derive(NativeClass)]
struct Parent {
    linkage: Linkage,
}

#[derive(NativeClass)]
struct Child {
    linkage: Linkage,
    #[bridge(base)]
    left: Arc<Parent>,
    #[bridge(base)]
    right: Arc<Parent>,
}

fn main() {}
