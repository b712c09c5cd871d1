// Deriv websocket API module
pub mod channel;
pub mod messages;
pub mod session;

pub use channel::{Channel, WsChannel};
pub use session::{CandleBatch, DerivSession};
