#![doc = include_str!("../README.md")]

pub use cursor::Cursor;
pub use error::Error;
pub use map::{Entry, IntoIter, Iter, IterMut, OccupiedEntry, RbMap, VacantEntry};

pub mod map;
mod cursor;
mod error;
mod node;
