pub mod dispatcher;
pub mod gateway;

pub use dispatcher::{Dispatcher, TickReport, run_scheduler};
pub use gateway::{MessagingGateway, TelegramGateway};
