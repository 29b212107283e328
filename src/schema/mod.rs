//! Built-in model registration.

pub mod builtin;

pub use builtin::register_builtin_models;
