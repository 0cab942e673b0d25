//! Static-ct-api style tiled log access.

pub mod checkpoint;
pub mod client;
pub mod source;
pub mod tile;

pub use checkpoint::{parse_checkpoint, Checkpoint};
pub use client::TiledLogClient;
pub use source::TiledLogDataSource;
pub use tile::{
    encode_tile_entries, tile_index_from_path, tile_path_from_index, LogEntry, TILE_WIDTH,
};
