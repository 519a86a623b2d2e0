//! The NACP (application control property) table, which holds the name, author and version of
//! an application.
//!
//! Only the fields relevant to homebrew are modelled: a fixed number of language entries, each
//! with a name and an author, and a single version string shared by every language. Text fields
//! are UTF-8, right-padded with zero bytes up to their width.

use easyerr::Error;
use strum::{Display, VariantArray};

/// Size of a complete NACP table.
pub const NACP_SIZE: usize = 0x4000;

/// Size of a language entry.
pub const ENTRY_SIZE: usize = 0x300;

/// Offset of the shared version field.
pub const VERSION_OFFSET: usize = 0x3060;

/// The languages of the entries in a NACP table, in the order they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, VariantArray)]
pub enum Language {
    #[strum(serialize = "American English")]
    AmericanEnglish,
    #[strum(serialize = "British English")]
    BritishEnglish,
    Japanese,
    French,
    German,
    #[strum(serialize = "Latin American Spanish")]
    LatinAmericanSpanish,
    Spanish,
    Italian,
    Dutch,
    #[strum(serialize = "Canadian French")]
    CanadianFrench,
    Portuguese,
    Russian,
    Korean,
    #[strum(serialize = "Traditional Chinese")]
    TraditionalChinese,
    #[strum(serialize = "Simplified Chinese")]
    SimplifiedChinese,
}

impl Language {
    /// Offset of the entry of this language in the table.
    pub fn offset(self) -> usize {
        self as usize * ENTRY_SIZE
    }
}

/// A text field of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Field {
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "author")]
    Author,
    #[strum(serialize = "version")]
    Version,
}

impl Field {
    /// Width of the field in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Name => 0x200,
            Self::Author => 0x100,
            Self::Version => 0x10,
        }
    }

    /// Offset of the field, relative to its language entry for names and authors and to the
    /// start of the table for the version.
    const fn offset(self) -> usize {
        match self {
            Self::Name => 0,
            Self::Author => 0x200,
            Self::Version => VERSION_OFFSET,
        }
    }

    fn range(self, language: Language) -> std::ops::Range<usize> {
        let start = match self {
            Self::Version => self.offset(),
            _ => language.offset() + self.offset(),
        };

        start..start + self.width()
    }
}

/// What to do with text that does not fit in its field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Cut the text at the last character boundary that fits.
    #[default]
    Truncate,
    /// Fail with [`ApplyError::FieldTooLong`].
    Strict,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{field} of {language} is not valid UTF-8 past byte {valid_up_to}")]
    InvalidEncoding {
        field: Field,
        language: Language,
        valid_up_to: usize,
    },
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{field} is {len} bytes long, but at most {max} bytes fit")]
    FieldTooLong { field: Field, len: usize, max: usize },
}

/// Reads a field, treating bytes past the end of `table` as zeroes.
fn read_field(table: &[u8], field: Field, language: Language) -> Result<String, ParseError> {
    let range = field.range(language);
    let bytes = table.get(range.start..).unwrap_or_default();
    let bytes = &bytes[..bytes.len().min(field.width())];

    let len = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    match std::str::from_utf8(&bytes[..len]) {
        Ok(text) => Ok(text.to_owned()),
        Err(err) => Err(ParseError::InvalidEncoding {
            field,
            language,
            valid_up_to: err.valid_up_to(),
        }),
    }
}

/// Writes a field, zero-padding `text` up to the width of the field.
fn write_field(table: &mut [u8], field: Field, language: Language, text: &str) {
    let dest = &mut table[field.range(language)];
    dest.fill(0);
    dest[..text.len()].copy_from_slice(text.as_bytes());
}

/// Makes `text` fit in `field` according to `policy`.
fn fit(text: &str, field: Field, policy: FieldPolicy) -> Result<&str, ApplyError> {
    let max = field.width();
    if text.len() <= max {
        return Ok(text);
    }

    match policy {
        FieldPolicy::Strict => Err(ApplyError::FieldTooLong {
            field,
            len: text.len(),
            max,
        }),
        FieldPolicy::Truncate => {
            let mut end = max;
            while !text.is_char_boundary(end) {
                end -= 1;
            }

            tracing::warn!(%field, len = text.len(), max, "truncating field");
            Ok(&text[..end])
        }
    }
}

/// The name and author stored in a single language entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleEntry {
    pub language: Language,
    pub name: String,
    pub author: String,
}

/// Every language entry of `table`, in order.
pub fn entries(table: &[u8]) -> Result<Vec<LocaleEntry>, ParseError> {
    Language::VARIANTS
        .iter()
        .map(|&language| {
            Ok(LocaleEntry {
                language,
                name: read_field(table, Field::Name, language)?,
                author: read_field(table, Field::Author, language)?,
            })
        })
        .collect()
}

/// The human readable metadata of an application.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub author: String,
    pub version: String,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            version: version.into(),
        }
    }

    /// Reads the metadata of a NACP table. The name and author are taken from the first
    /// language entry.
    ///
    /// Tables shorter than [`NACP_SIZE`] are read as if they were padded with zeroes.
    pub fn parse(table: &[u8]) -> Result<Self, ParseError> {
        let first = Language::AmericanEnglish;
        Ok(Self {
            name: read_field(table, Field::Name, first)?,
            author: read_field(table, Field::Author, first)?,
            version: read_field(table, Field::Version, first)?,
        })
    }

    /// Returns a copy of `table` with this metadata written to it: the name and author go to
    /// every language entry, and the version to the shared version field.
    ///
    /// The result is at least [`NACP_SIZE`] bytes long. Bytes outside of the written fields are
    /// kept as they are.
    pub fn apply(&self, table: &[u8], policy: FieldPolicy) -> Result<Vec<u8>, ApplyError> {
        let name = fit(&self.name, Field::Name, policy)?;
        let author = fit(&self.author, Field::Author, policy)?;
        let version = fit(&self.version, Field::Version, policy)?;

        let mut out = table.to_vec();
        if out.len() < NACP_SIZE {
            out.resize(NACP_SIZE, 0);
        }

        for &language in Language::VARIANTS {
            write_field(&mut out, Field::Name, language, name);
            write_field(&mut out, Field::Author, language, author);
        }

        write_field(&mut out, Field::Version, Language::AmericanEnglish, version);
        Ok(out)
    }
}
