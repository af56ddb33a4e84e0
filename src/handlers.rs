pub mod calendar;
pub mod cart;
pub mod catalog;
pub mod orders;
