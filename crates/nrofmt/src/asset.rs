//! The asset block appended to a `.nro` after its payload.
//!
//! Layout (all integers little-endian, offsets relative to the start of the block):
//! ```text
//! Offset  Size  Field
//! 0x00    4     magic ("ASET")
//! 0x04    4     version (zero)
//! 0x08    16    icon position and size
//! 0x18    16    nacp position and size
//! 0x28    16    romfs position and size
//! 0x38          section data: icon, nacp, romfs
//! ```
//!
//! A section with a size of zero is absent, and is stored with a position of zero as well.

use binrw::{
    BinRead, BinWrite,
    io::{Cursor, Write},
};
use easyerr::{Error, ResultExt};
use strum::{Display, VariantArray};

/// Magic of the asset block.
pub const MAGIC: &[u8; 4] = b"ASET";

/// Size of the asset block header.
pub const HEADER_SIZE: usize = 0x38;

/// Position and size of a section, as stored in the header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct SectionInfo {
    pub position: u64,
    pub size: u64,
}

/// The header of an asset block.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little, magic = b"ASET")]
pub struct Header {
    pub version: u32,
    pub icon: SectionInfo,
    pub nacp: SectionInfo,
    pub romfs: SectionInfo,
}

impl Header {
    pub fn section(&self, kind: SectionKind) -> SectionInfo {
        match kind {
            SectionKind::Icon => self.icon,
            SectionKind::Nacp => self.nacp,
            SectionKind::RomFs => self.romfs,
        }
    }
}

/// The sections of an asset block, in the order they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, VariantArray)]
pub enum SectionKind {
    #[strum(serialize = "icon")]
    Icon,
    #[strum(serialize = "nacp")]
    Nacp,
    #[strum(serialize = "romfs")]
    RomFs,
}

/// The contents of a section.
///
/// `Present` always holds at least one byte: use [`Section::new`] to build a section out of a
/// buffer that might be empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum Section {
    #[default]
    Absent,
    Present(Vec<u8>),
}

impl Section {
    pub fn new(data: Vec<u8>) -> Self {
        if data.is_empty() {
            Self::Absent
        } else {
            Self::Present(data)
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(data) if !data.is_empty())
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Absent => &[],
            Self::Present(data) => data,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Absent => Vec::new(),
            Self::Present(data) => data,
        }
    }
}

impl From<Vec<u8>> for Section {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Header { source: binrw::Error },
    #[error("{kind} section (position 0x{position:X}, size 0x{size:X}) is outside of the asset block")]
    OutOfBounds {
        kind: SectionKind,
        position: u64,
        size: u64,
    },
}

/// An asset block: icon, NACP and RomFS.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssetBlock {
    pub icon: Section,
    pub nacp: Section,
    pub romfs: Section,
}

fn extract(block: &[u8], kind: SectionKind, info: SectionInfo) -> Result<Section, DecodeError> {
    if info.size == 0 {
        return Ok(Section::Absent);
    }

    let out_of_bounds = || DecodeError::OutOfBounds {
        kind,
        position: info.position,
        size: info.size,
    };

    let start = usize::try_from(info.position).map_err(|_| out_of_bounds())?;
    let size = usize::try_from(info.size).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(size).ok_or_else(out_of_bounds)?;
    let data = block.get(start..end).ok_or_else(out_of_bounds)?;

    Ok(Section::Present(data.to_vec()))
}

/// Reads the header of the asset block that follows a payload of `payload_size` bytes in
/// `bytes`, as it is stored.
///
/// Returns `Ok(None)` if there is no asset block, i.e. `bytes` ends at most four bytes after the
/// payload or the bytes following the payload are not the `ASET` magic.
pub fn read_header(bytes: &[u8], payload_size: usize) -> Result<Option<Header>, DecodeError> {
    if bytes.len() <= payload_size.saturating_add(MAGIC.len()) {
        return Ok(None);
    }

    let block = &bytes[payload_size..];
    if &block[..MAGIC.len()] != MAGIC {
        return Ok(None);
    }

    let header = Header::read(&mut Cursor::new(block)).context(DecodeCtx::Header)?;
    Ok(Some(header))
}

impl AssetBlock {
    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Icon => &self.icon,
            SectionKind::Nacp => &self.nacp,
            SectionKind::RomFs => &self.romfs,
        }
    }

    /// Decodes the asset block that follows a payload of `payload_size` bytes in `bytes`.
    ///
    /// Returns `Ok(None)` if there is no asset block, see [`read_header`].
    pub fn decode(bytes: &[u8], payload_size: usize) -> Result<Option<Self>, DecodeError> {
        let Some(header) = read_header(bytes, payload_size)? else {
            return Ok(None);
        };

        tracing::debug!(?header, "decoding asset block");
        let block = &bytes[payload_size..];

        Ok(Some(Self {
            icon: extract(block, SectionKind::Icon, header.icon)?,
            nacp: extract(block, SectionKind::Nacp, header.nacp)?,
            romfs: extract(block, SectionKind::RomFs, header.romfs)?,
        }))
    }

    /// Computes the header for the current contents: sections are packed right after the
    /// header, in order, and absent sections are stored as a zeroed position/size pair.
    pub fn header(&self) -> Header {
        let mut offset = HEADER_SIZE as u64;
        let mut next = |section: &Section| {
            let size = section.len() as u64;
            if size == 0 {
                return SectionInfo::default();
            }

            let info = SectionInfo {
                position: offset,
                size,
            };

            offset += size;
            info
        };

        Header {
            version: 0,
            icon: next(&self.icon),
            nacp: next(&self.nacp),
            romfs: next(&self.romfs),
        }
    }

    /// Total size of the encoded block.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.icon.len() + self.nacp.len() + self.romfs.len()
    }

    /// Encodes the asset block, recomputing the position of every section.
    pub fn encode(&self) -> Result<Vec<u8>, binrw::Error> {
        let header = self.header();
        tracing::debug!(?header, "encoding asset block");

        let mut writer = Cursor::new(Vec::with_capacity(self.encoded_len()));
        header.write(&mut writer)?;
        for kind in SectionKind::VARIANTS {
            writer.write_all(self.section(*kind).bytes())?;
        }

        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn block(icon: &[u8], nacp: &[u8], romfs: &[u8]) -> AssetBlock {
        AssetBlock {
            icon: Section::new(icon.to_vec()),
            nacp: Section::new(nacp.to_vec()),
            romfs: Section::new(romfs.to_vec()),
        }
    }

    fn read_u64(bytes: &[u8], offset: usize) -> u64 {
        u64::from_le_bytes(bytes[offset..][..8].try_into().unwrap())
    }

    #[test]
    fn empty_block_is_header_only() {
        let encoded = AssetBlock::default().encode().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(&encoded[..4], b"ASET");
        assert!(encoded[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn positions_are_packed_in_order() {
        let assets = block(&[1; 0x20], &[2; 0x4000], &[3; 0x11]);
        let encoded = assets.encode().unwrap();

        assert_eq!(encoded.len(), HEADER_SIZE + 0x20 + 0x4000 + 0x11);
        assert_eq!(read_u64(&encoded, 0x08), 0x38);
        assert_eq!(read_u64(&encoded, 0x10), 0x20);
        assert_eq!(read_u64(&encoded, 0x18), 0x38 + 0x20);
        assert_eq!(read_u64(&encoded, 0x20), 0x4000);
        assert_eq!(read_u64(&encoded, 0x28), 0x38 + 0x20 + 0x4000);
        assert_eq!(read_u64(&encoded, 0x30), 0x11);

        assert_eq!(&encoded[0x38..0x58], &[1; 0x20]);
        assert_eq!(encoded[0x58], 2);
        assert_eq!(&encoded[0x38 + 0x20 + 0x4000..], &[3; 0x11]);
    }

    #[test]
    fn absent_sections_are_zeroed() {
        let assets = block(&[], &[7; 0x10], &[]);
        let header = assets.header();

        assert_eq!(header.icon, SectionInfo::default());
        assert_eq!(
            header.nacp,
            SectionInfo {
                position: 0x38,
                size: 0x10
            }
        );
        assert_eq!(header.romfs, SectionInfo::default());
    }

    #[test]
    fn decodes_what_was_encoded() {
        let cases = [
            block(&[], &[], &[]),
            block(&[0xFF, 0xD8, 0xFF], &[], &[]),
            block(&[], &[0x41; 0x4000], &[9; 3]),
            block(&[1; 5], &[2; 6], &[3; 7]),
        ];

        for assets in cases {
            let mut bytes = crate::nro::fake_nro(0x100);
            bytes.extend(assets.encode().unwrap());

            let decoded = AssetBlock::decode(&bytes, 0x100).unwrap().unwrap();
            assert_eq!(decoded, assets);
        }
    }

    #[test]
    fn reads_stored_header() {
        let assets = block(&[1; 3], &[], &[2; 5]);
        let mut bytes = crate::nro::fake_nro(0x100);
        bytes.extend(assets.encode().unwrap());

        let header = read_header(&bytes, 0x100).unwrap().unwrap();
        assert_eq!(header, assets.header());
        assert_eq!(header.section(SectionKind::RomFs).position, 0x38 + 3);
    }

    #[test]
    fn recomputes_stale_positions() {
        let mut assets = block(&[1; 4], &[2; 4], &[3; 4]);
        assets.icon = Section::new(vec![9; 0x100]);

        let header = assets.header();
        assert_eq!(header.nacp.position, 0x38 + 0x100);
        assert_eq!(header.romfs.position, 0x38 + 0x100 + 4);
    }

    #[test]
    fn missing_block_is_none() {
        let bytes = crate::nro::fake_nro(0x100);
        assert_eq!(AssetBlock::decode(&bytes, 0x100).unwrap(), None);

        let mut short = bytes.clone();
        short.extend_from_slice(b"ASET");
        assert_eq!(AssetBlock::decode(&short, 0x100).unwrap(), None);

        let mut other = bytes;
        other.extend_from_slice(&[0; 0x40]);
        assert_eq!(AssetBlock::decode(&other, 0x100).unwrap(), None);
    }

    #[test]
    fn zero_size_ignores_position() {
        let mut bytes = AssetBlock::default().encode().unwrap();
        bytes[0x08..0x10].copy_from_slice(&0x1234u64.to_le_bytes());

        let decoded = AssetBlock::decode(&bytes, 0).unwrap().unwrap();
        assert_eq!(decoded.icon, Section::Absent);
    }

    #[test]
    fn rejects_out_of_bounds_section() {
        let mut bytes = block(&[1; 0x10], &[], &[]).encode().unwrap();
        bytes[0x10..0x18].copy_from_slice(&0x11u64.to_le_bytes());

        assert!(matches!(
            AssetBlock::decode(&bytes, 0),
            Err(DecodeError::OutOfBounds {
                kind: SectionKind::Icon,
                position: 0x38,
                size: 0x11
            })
        ));

        bytes[0x08..0x10].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(
            AssetBlock::decode(&bytes, 0),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        let mut bytes = crate::nro::fake_nro(0x100);
        bytes.extend_from_slice(b"ASET\0\0\0\0\x38\0");

        assert!(matches!(
            AssetBlock::decode(&bytes, 0x100),
            Err(DecodeError::Header { .. })
        ));
    }

    #[test]
    fn present_section_never_empty() {
        assert_eq!(Section::new(Vec::new()), Section::Absent);
        assert!(!Section::Absent.is_present());
        assert!(Section::new(vec![0]).is_present());
        assert_eq!(Section::from(vec![1, 2]).into_bytes(), vec![1, 2]);
    }
}
