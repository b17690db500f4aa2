pub mod session;
pub mod transport;

pub use session::{ ChatSession, TURN_ERROR_MESSAGE };
pub use transport::{ RelayClient, StreamDecoder };
