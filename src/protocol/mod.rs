pub mod codec;
pub mod frame;
pub mod message;

pub use codec::{ADDR_SIZE, decode_addr, encode_addr, is_unset_addr};
pub use frame::{FRAME_HEADER_SIZE, read_frame_into, read_frame_len, write_frame};
pub use message::{PEER_HEADER_SIZE, PeerHeader, REGISTRATION_SIZE, Registration};
