//! Calendar export of planned blocks.

mod ics;

pub use ics::{blocks_to_ics, PRODUCT_ID};
