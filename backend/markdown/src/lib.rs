//! Chat markdown helpers: fenced block scanning, message splitting,
//! fenced pagination and mention escaping.

pub mod code_block;
pub mod escape;
pub mod paginator;
pub mod split;

pub use code_block::{FENCE, FencedBlock, block_at, fenced_blocks};
pub use escape::escape_mentions;
pub use paginator::Paginator;
pub use split::{MESSAGE_LIMIT, split_message};
