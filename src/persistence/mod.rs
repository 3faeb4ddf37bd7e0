pub mod store;

pub use store::{BotState, BotStore, Subscriber};
