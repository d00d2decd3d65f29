//! Workloads shared by the benches, each paired with a standard library equivalent where one exists.

pub mod channel;
pub mod select;
