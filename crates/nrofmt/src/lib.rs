//! Parsers and writers for the asset block of Nintendo Switch homebrew executables.
//!
//! A `.nro` file is made of the executable payload, whose size is declared in its header,
//! optionally followed by an asset block holding an icon, a NACP metadata table and a RomFS
//! image:
//!
//! ```text
//! +---------------------------+ 0x0
//! | NRO payload               |
//! |  - 0x10: "NRO0"           |
//! |  - 0x18: payload size     |
//! +---------------------------+ payload size
//! | Asset header ("ASET")     |
//! +---------------------------+ + 0x38
//! | Icon                      |
//! | NACP                      |
//! | RomFS                     |
//! +---------------------------+
//! ```
//!
//! Everything operates on in-memory buffers: reading and writing files is left to the caller.

pub mod asset;
pub mod editor;
pub mod nacp;
pub mod nro;

pub use binrw;
pub use editor::Editor;
