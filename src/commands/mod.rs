pub mod convert;
pub mod sources;
