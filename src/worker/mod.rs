mod dispatcher;
pub mod message;
mod server;
pub mod state;
pub mod types;

pub use dispatcher::Dispatcher;
pub use message::{spawn_message_loop, Ack, WorkerHandle, WorkerMessage};
pub use server::{front_router, serve};
pub use state::BlockingState;
