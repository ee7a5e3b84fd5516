pub(crate) mod engine;
pub(crate) mod segment;
pub(crate) mod wrap;
