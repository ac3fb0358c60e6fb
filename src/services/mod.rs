pub mod account_service;
pub mod delivery_service;

pub use account_service::AccountService;
pub use delivery_service::DeliveryService;
