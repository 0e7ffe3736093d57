//! Parsers for the ERFA sources: headers, function sources and C tests.

pub mod argument;
pub mod constants;
pub mod ctest;
pub mod doc;
pub mod function;
pub mod header;
