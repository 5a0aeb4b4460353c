//! Typed input handling

mod debounce;

pub use debounce::Debouncer;
