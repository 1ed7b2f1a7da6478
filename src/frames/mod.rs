//! Source frame intake: decoding and the ordered frame store.

pub mod decode;
pub mod store;
