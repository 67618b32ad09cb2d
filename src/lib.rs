extern crate byteorder;

mod scalar;
mod string;
mod table;
mod vector;

pub mod builder;
pub mod error;
pub mod io;
pub mod le;
pub mod position;
pub mod types;
pub mod verifier;

pub use error::VerifyError;
pub use scalar::Scalar;
pub use string::String;
pub use table::{Struct, Table, TableMut, TableWithVTable};
pub use vector::Vector;
