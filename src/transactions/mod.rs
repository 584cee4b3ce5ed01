//! Pre-made transactions on downloaded artifact archives.

#![cfg(feature = "rest")]

mod download_and_extract_archive;
mod extract_archive;

pub use download_and_extract_archive::*;
pub use extract_archive::*;
