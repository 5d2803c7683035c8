//! Entity stores
//!
//! Typed access to the content store: movies, articles, taxonomy terms,
//! and media asset records. Every find-or-create path is an upsert
//! against a UNIQUE key so concurrent duplicate requests converge on one
//! row.

pub mod articles;
pub mod assets;
pub mod movies;
pub mod terms;
