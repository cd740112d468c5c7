pub mod queue_item;
pub mod quiz;
pub mod quiz_response;
pub mod session;
pub mod user;
pub use queue_item::{OfflineQueueItem, QueuePayload, MAX_SYNC_RETRIES};
pub use quiz::{Question, QuestionKind, Quiz};
pub use quiz_response::{Answer, QuestionResponse, QuizResponse};
pub use session::QuizSession;
pub use user::User;
