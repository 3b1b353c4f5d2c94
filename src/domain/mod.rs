pub mod page;
pub mod status;
