mod block_cache;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use range_reader::{
    read_u16_be, read_u16_le, read_u32_be, read_u32_le, swap_in_place, ByteOrder,
    FileRangeReader, RangeReader,
};
