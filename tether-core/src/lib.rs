pub mod codec;
pub mod model;

pub use codec::{Base64JsonCodec, Codec, CodecError};
pub use model::*;
