pub mod checker;
pub mod demand;
pub mod error;
pub mod fitness;
pub mod grid;
pub mod input;
pub mod models;
pub mod optimizer;
pub mod placement;
pub mod schedule;
pub mod time;
pub mod tune;
pub mod wolf;

#[cfg(test)]
pub(crate) mod test_support;
