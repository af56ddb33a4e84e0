pub mod cart_service;
pub use cart_service::CartService;
pub mod notification_service;
pub use notification_service::NotificationService;
pub mod order_number;
pub mod order_service;
pub use order_service::OrderService;
