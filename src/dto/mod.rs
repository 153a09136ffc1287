pub mod assignments;
pub mod payments;
