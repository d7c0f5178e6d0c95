//! Shared builders of small routing models used across unit tests.


pub use self::models::*;
