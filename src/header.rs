use std::cmp::Ordering;

use http::header::HeaderName;

/// Prefix of the platform's custom headers. Every header carrying it takes
/// part in the signature.
pub const SIGNED_HEADER_PREFIX: &str = "x-m-";

/// Entries of the canonical header block which are not ordinary headers.
#[derive(Debug, Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
#[non_exhaustive]
pub enum PseudoHeader {
    /// Equipment id. Always present in the canonical block, with an empty
    /// value unless the request carries an `equip_id` header.
    EquipId,
}

impl PseudoHeader {
    /// Returns the name used in the canonical header block.
    pub fn as_str(&self) -> &str {
        match self {
            PseudoHeader::EquipId => "equip_id",
        }
    }
}

/// A single entry of the canonical header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    /// A synthetic entry.
    Pseudo(PseudoHeader),
    /// A real request header.
    Normal(HeaderName),
}

impl Header {
    /// Returns the lowercase name of this entry.
    pub fn as_str(&self) -> &str {
        match self {
            Header::Pseudo(h) => h.as_str(),
            Header::Normal(h) => h.as_str(),
        }
    }

    /// Whether a request header with this name is part of the signature.
    pub fn is_signed(name: &HeaderName) -> bool {
        // `HeaderName` is always lowercase
        name.as_str().starts_with(SIGNED_HEADER_PREFIX)
    }
}

impl Ord for Header {
    fn cmp(&self, other: &Header) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Header {
    fn partial_cmp(&self, other: &Header) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<HeaderName> for Header {
    fn from(other: HeaderName) -> Self {
        Header::Normal(other)
    }
}

impl From<PseudoHeader> for Header {
    fn from(other: PseudoHeader) -> Self {
        Header::Pseudo(other)
    }
}
