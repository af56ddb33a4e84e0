pub mod abuse;
pub mod admin;
pub mod origin;
