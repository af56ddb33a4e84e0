pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod calendar_repo;
pub use calendar_repo::CalendarRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
