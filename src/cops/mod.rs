//! Built-in cops.

pub mod method_order;
pub mod util;

pub use method_order::{MethodOrder, OrderStyle};
