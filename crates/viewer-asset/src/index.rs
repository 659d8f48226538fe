use std::fmt::{self, Display, Formatter, LowerHex, UpperHex};

/// Content digest identifying one loaded asset.
///
/// Two fetches of the same bytes produce the same id, which makes the
/// id usable for log correlation without any shared cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub [u8; 32]);

impl LowerHex for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl UpperHex for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl AsRef<[u8; 32]> for AssetId {
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for AssetId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self)
    }
}

impl AssetId {
    #[cfg(feature = "digest")]
    pub fn digest_from_buffer(buffer: &[u8]) -> Self {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(buffer);
        let hash = hasher.finalize();
        Self(hash.into())
    }
}

#[cfg(test)]
mod test {
    use super::AssetId;

    #[test]
    #[cfg(feature = "digest")]
    fn digest_is_stable() {
        let first = AssetId::digest_from_buffer(b"model bytes");
        let second = AssetId::digest_from_buffer(b"model bytes");
        assert_eq!(first, second);
        assert_ne!(first, AssetId::digest_from_buffer(b"other bytes"));
    }

    #[test]
    fn hex_formatting() {
        let id = AssetId([0xab; 32]);
        assert_eq!(format!("{:x}", id), "ab".repeat(32));
        assert_eq!(format!("{:X}", id), "AB".repeat(32));
    }
}
