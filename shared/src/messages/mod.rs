pub mod error;
pub mod notify;
pub mod ordered_receiver;
pub mod packet;
pub mod request;
pub mod sequence;

pub use error::ReceiverError;
pub use notify::Notify;
pub use ordered_receiver::OrderedReceiver;
pub use packet::{Envelope, Packet};
pub use request::Request;
pub use sequence::OutgoingSequence;
