//! Conversions from external errors into the canonical taxonomy.

mod conversions;

pub use conversions::IntoCanonical;
