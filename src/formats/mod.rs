pub mod lines;

pub use lines::{decode, encode, BlockRecord};
