// src/command/mod.rs

//! Command description and its builder.

pub mod builder;
pub mod spec;

pub use builder::CommandBuilder;
pub use spec::CommandSpec;
