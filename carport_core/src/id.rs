use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

const ID_MAGIC_BYTE: u8 = 0x43;
const ID_HASH_BLAKE3: u8 = 0x1e;

#[derive(thiserror::Error, Debug)]
pub enum ContentIdError {
    #[error("invalid multibase string: {0}")]
    Multibase(#[from] multibase::Error),
    #[error("invalid length: expected 34 bytes, got {0}")]
    InvalidLength(usize),
    #[error("invalid magic byte: expected {0:#x}, got {1:#x}")]
    InvalidMagicByte(u8, u8),
    #[error("invalid hash type: expected {0:#x}, got {1:#x}")]
    InvalidHashType(u8, u8),
}

/// Content-derived identifier for a byte sequence or a serialized
/// directory node.
///
/// A `ContentId` is the BLAKE3 hash of the content it names, encoded as a
/// multibase string with a two-byte prefix (magic byte + hash type). Equal
/// inputs always yield equal ids, so the id doubles as a store key and as
/// an integrity proof: any mutation of a node changes the id of every
/// ancestor that links to it.
///
/// ```no_run
/// use carport_core::ContentId;
///
/// let id = ContentId::from_data(b"hello");
/// println!("content id: {}", id);
/// ```
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ContentId([u8; 32]);

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContentId").field(&self.to_hex()).finish()
    }
}

impl ContentId {
    /// The size of the underlying hash in bytes.
    pub const SIZE: usize = 32;

    /// Computes the identifier of the provided bytes.
    pub fn from_data(data: impl AsRef<[u8]>) -> Self {
        Self(*blake3::hash(data.as_ref()).as_bytes())
    }

    /// Builds an identifier from raw hash bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw hash bytes of the identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn parse(str: &str) -> Result<Self, ContentIdError> {
        let (_, bytes) = multibase::decode(str)?;

        if bytes.len() != 34 {
            return Err(ContentIdError::InvalidLength(bytes.len()));
        }
        if bytes[0] != ID_MAGIC_BYTE {
            return Err(ContentIdError::InvalidMagicByte(ID_MAGIC_BYTE, bytes[0]));
        }
        if bytes[1] != ID_HASH_BLAKE3 {
            return Err(ContentIdError::InvalidHashType(ID_HASH_BLAKE3, bytes[1]));
        }

        let hash: [u8; 32] = bytes[2..34]
            .try_into()
            .map_err(|_| ContentIdError::InvalidLength(bytes.len()))?;
        Ok(Self(hash))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [&[ID_MAGIC_BYTE, ID_HASH_BLAKE3], self.0.as_slice()].concat()
    }

    pub fn to_base32(&self) -> String {
        multibase::encode(multibase::Base::Base32Lower, self.to_bytes())
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from_bytes(self.0).to_hex().to_string()
    }

    /// First four hash bytes as hex, for log lines.
    pub fn fmt_short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl AsRef<[u8]> for ContentId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8; 32]> for ContentId {
    fn borrow(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentId {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<ContentId> for [u8; 32] {
    fn from(value: ContentId) -> Self {
        value.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base32())
    }
}

impl FromStr for ContentId {
    type Err = ContentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentId::parse(s)
    }
}
