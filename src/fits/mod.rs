pub mod bintable;
pub mod error;
pub mod hdulist;
pub mod header;
pub mod primary;
pub mod utils;

pub use bintable::{BinTable, Field, FieldType};
pub use error::FitsReadError;
pub use hdulist::{Hdu, HduList};
pub use header::{Card, CardValue, Header};
pub use primary::PrimaryHdu;
