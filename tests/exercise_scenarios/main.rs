//! End-to-end scenarios through the `stashkit` facade crate.
//!
//! Each module drives one area the way an application would: construct the
//! backends, hand them to the components, observe the store.

mod common;

mod cache;
mod replay;
mod schools;
