pub mod offline_queue_service;
pub mod session_service;
pub mod user_service;

pub use offline_queue_service::OfflineQueueService;
pub use session_service::SessionService;
pub use user_service::UserService;
