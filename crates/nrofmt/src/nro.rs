//! The header of a `.nro` executable, which declares where the payload ends and the asset
//! block begins.

use binrw::{BinRead, BinWrite, io::Cursor};
use easyerr::{Error, ResultExt};

/// Size of the start and header regions of a `.nro`.
pub const HEADER_SIZE: usize = 0x80;

/// Offset of the `NRO0` magic.
pub const MAGIC_OFFSET: usize = 0x10;

/// Offset of the payload size.
pub const SIZE_OFFSET: usize = 0x18;

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
#[brw(little, magic = b"NRO0")]
pub struct MagicWord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct Segment {
    /// Offset of the segment in the file.
    pub offset: u32,
    /// Size of the segment.
    pub size: u32,
}

/// The start and header regions of a `.nro`.
#[derive(Debug, Clone, BinRead, BinWrite)]
#[brw(little)]
pub struct Header {
    /// Offset of the MOD0 header.
    #[brw(pad_before = 0x4)]
    pub mod_offset: u32,
    #[brw(pad_before = 0x8)]
    pub magic: MagicWord,
    pub version: u32,
    /// Size of the executable payload. The asset block, if any, starts right after it.
    pub size: u32,
    pub flags: u32,
    /// The .text, .rodata and .data segments, in that order.
    pub segments: [Segment; 3],
    pub bss_size: u32,
    #[brw(pad_before = 0x4)]
    #[brw(pad_after = 0x20)]
    pub build_id: [u8; 0x20],
}

impl Header {
    pub fn text(&self) -> Segment {
        self.segments[0]
    }

    pub fn rodata(&self) -> Segment {
        self.segments[1]
    }

    pub fn data(&self) -> Segment {
        self.segments[2]
    }

    /// The build id as a lowercase hex string, without trailing zero bytes.
    pub fn build_id_hex(&self) -> String {
        let len = self
            .build_id
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);

        self.build_id[..len]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("file is too short to be a .nro ({f0} bytes, need at least 0x80)")]
    TooShort(usize),
    #[error("invalid .nro magic {f0:02X?}, expected \"NRO0\"")]
    BadMagic([u8; 4]),
    #[error("declared payload size 0x{size:X} is outside of the file (0x{len:X} bytes)")]
    SizeOutOfBounds { size: u32, len: usize },
    #[error(transparent)]
    Format { source: binrw::Error },
}

/// Validates the header of a `.nro` and returns it. The declared payload size (`header.size`)
/// is guaranteed to lie within `bytes`.
pub fn locate(bytes: &[u8]) -> Result<Header, LocateError> {
    if bytes.len() < HEADER_SIZE {
        return Err(LocateError::TooShort(bytes.len()));
    }

    let mut magic = [0; 4];
    magic.copy_from_slice(&bytes[MAGIC_OFFSET..][..4]);
    if &magic != b"NRO0" {
        return Err(LocateError::BadMagic(magic));
    }

    let header = Header::read(&mut Cursor::new(bytes)).context(LocateCtx::Format)?;
    let size = header.size as usize;
    if size < HEADER_SIZE || size > bytes.len() {
        return Err(LocateError::SizeOutOfBounds {
            size: header.size,
            len: bytes.len(),
        });
    }

    tracing::debug!(size = header.size, "located .nro payload");
    Ok(header)
}

/// Builds a zero-filled `.nro` of the given size with a valid header.
#[cfg(test)]
pub(crate) fn fake_nro(size: u32) -> Vec<u8> {
    let mut bytes = vec![0; size as usize];
    bytes[MAGIC_OFFSET..][..4].copy_from_slice(b"NRO0");
    bytes[SIZE_OFFSET..][..4].copy_from_slice(&size.to_le_bytes());
    bytes
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_payload_size() {
        let bytes = fake_nro(0x1000);
        let header = locate(&bytes).unwrap();
        assert_eq!(header.size, 0x1000);
    }

    #[test]
    fn reads_segments_and_build_id() {
        let mut bytes = fake_nro(0x200);
        bytes[0x20..0x24].copy_from_slice(&0x80u32.to_le_bytes());
        bytes[0x24..0x28].copy_from_slice(&0x40u32.to_le_bytes());
        bytes[0x30..0x34].copy_from_slice(&0xC0u32.to_le_bytes());
        bytes[0x38..0x3C].copy_from_slice(&0x10u32.to_le_bytes());
        bytes[0x40] = 0xAB;
        bytes[0x41] = 0x01;

        let header = locate(&bytes).unwrap();
        assert_eq!(
            header.text(),
            Segment {
                offset: 0x80,
                size: 0x40
            }
        );
        assert_eq!(header.data().offset, 0xC0);
        assert_eq!(header.rodata().size, 0);
        assert_eq!(header.bss_size, 0x10);
        assert_eq!(header.build_id_hex(), "ab01");
    }

    #[test]
    fn accepts_trailing_data() {
        let mut bytes = fake_nro(0x100);
        bytes.extend_from_slice(b"ASET and then some");
        assert_eq!(locate(&bytes).unwrap().size, 0x100);
    }

    #[test]
    fn rejects_short_input() {
        let bytes = fake_nro(0x1000);
        assert!(matches!(
            locate(&bytes[..0x1C]),
            Err(LocateError::TooShort(0x1C))
        ));
        assert!(matches!(locate(&[]), Err(LocateError::TooShort(0))));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = fake_nro(0x1000);
        bytes[MAGIC_OFFSET..][..4].copy_from_slice(b"NSO0");
        assert!(matches!(
            locate(&bytes),
            Err(LocateError::BadMagic(magic)) if &magic == b"NSO0"
        ));
    }

    #[test]
    fn rejects_size_past_end() {
        let mut bytes = fake_nro(0x1000);
        bytes.truncate(0x800);
        assert!(matches!(
            locate(&bytes),
            Err(LocateError::SizeOutOfBounds {
                size: 0x1000,
                len: 0x800
            })
        ));
    }

    #[test]
    fn rejects_size_inside_header() {
        let mut bytes = fake_nro(0x1000);
        bytes[SIZE_OFFSET..][..4].copy_from_slice(&0x20u32.to_le_bytes());
        assert!(matches!(
            locate(&bytes),
            Err(LocateError::SizeOutOfBounds { size: 0x20, .. })
        ));
    }
}
