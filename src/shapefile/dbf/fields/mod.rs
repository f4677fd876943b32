//! One codec per ".dbf" field type. Each owns the byte it pads with.
pub mod character;
pub mod date;
pub mod logical;
pub mod numeric;
