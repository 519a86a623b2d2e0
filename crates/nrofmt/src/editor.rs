//! Editing session over a whole `.nro`.

use easyerr::{Error, ResultExt};

use crate::{
    asset::{AssetBlock, Section},
    nacp::{self, FieldPolicy, Metadata},
    nro,
};

#[derive(Debug, Error)]
pub enum OpenError {
    #[error(transparent)]
    InvalidContainer { source: nro::LocateError },
    #[error(transparent)]
    InvalidAssets { source: crate::asset::DecodeError },
    #[error(transparent)]
    InvalidEncoding { source: nacp::ParseError },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error(transparent)]
    FieldTooLong { source: nacp::ApplyError },
    #[error(transparent)]
    Encode { source: binrw::Error },
}

/// An opened `.nro`, ready to have its assets edited.
///
/// The payload is kept as it was read, while the asset block is regenerated from scratch by
/// [`Editor::serialize`].
#[derive(Debug, Clone)]
pub struct Editor {
    header: nro::Header,
    payload: Vec<u8>,
    assets: AssetBlock,
    metadata: Metadata,
    policy: FieldPolicy,
}

impl Editor {
    /// Opens a `.nro` from its contents. A missing asset block is not an error: the editor
    /// starts with an empty one instead.
    pub fn open(mut bytes: Vec<u8>) -> Result<Self, OpenError> {
        let header = nro::locate(&bytes).context(OpenCtx::InvalidContainer)?;
        let payload_size = header.size as usize;

        let assets = match AssetBlock::decode(&bytes, payload_size)
            .context(OpenCtx::InvalidAssets)?
        {
            Some(assets) => assets,
            None => {
                tracing::debug!("no asset block, starting with an empty one");
                AssetBlock::default()
            }
        };

        let metadata = Metadata::parse(assets.nacp.bytes()).context(OpenCtx::InvalidEncoding)?;
        bytes.truncate(payload_size);

        Ok(Self {
            header,
            payload: bytes,
            assets,
            metadata,
            policy: FieldPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn set_policy(&mut self, policy: FieldPolicy) {
        self.policy = policy;
    }

    pub fn header(&self) -> &nro::Header {
        &self.header
    }

    /// The executable payload, without the asset block.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The asset block as it was read, with the icon replaced if [`Editor::set_icon`] was
    /// called. The NACP is only updated with the current metadata by [`Editor::serialize`].
    pub fn assets(&self) -> &AssetBlock {
        &self.assets
    }

    pub fn icon(&self) -> &Section {
        &self.assets.icon
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn author(&self) -> &str {
        &self.metadata.author
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Replaces the icon. The bytes are stored as they are, so they must already be in the
    /// format expected by the loader (a 256x256 JPEG).
    pub fn set_icon(&mut self, icon: Vec<u8>) {
        self.assets.icon = Section::new(icon);
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = metadata;
    }

    /// Produces the edited `.nro`: the original payload followed by the regenerated asset block.
    pub fn serialize(&self) -> Result<Vec<u8>, SaveError> {
        let nacp = self
            .metadata
            .apply(self.assets.nacp.bytes(), self.policy)
            .context(SaveCtx::FieldTooLong)?;

        let assets = AssetBlock {
            icon: self.assets.icon.clone(),
            nacp: Section::new(nacp),
            romfs: self.assets.romfs.clone(),
        };

        let encoded = assets.encode().context(SaveCtx::Encode)?;

        let mut out = Vec::with_capacity(self.payload.len() + encoded.len());
        out.extend_from_slice(&self.payload);
        out.extend(encoded);

        tracing::debug!(
            payload = self.payload.len(),
            assets = assets.encoded_len(),
            "serialized .nro"
        );

        Ok(out)
    }
}
