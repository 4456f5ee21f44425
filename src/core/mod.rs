pub mod agent;
pub mod marker;
