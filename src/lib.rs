#![allow(warnings)]
#![allow(dead_code)]

#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod def;
pub mod tracer;
pub(crate) mod util;

mod enc;

#[cfg(any(test, feature = "bench"))]
pub mod bench;
