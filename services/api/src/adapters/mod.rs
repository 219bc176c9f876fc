pub mod db;
pub mod hub;
pub mod mailer;
pub mod memory;

pub use db::DbAdapter;
pub use hub::RealtimeHub;
pub use mailer::LogMailer;
pub use memory::MemoryAdapter;
