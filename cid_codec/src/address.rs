use std::fmt;
use std::str::FromStr;

use cid::{Cid, Version};
use multihash::Multihash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CodecError, Result};
use crate::identifier::{ContentIdentifier, IDENTIFIER_LEN};

/// Multihash code for sha2-256.
pub const SHA2_256: u64 = 0x12;

/// Content codecs accepted in CIDv1 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCodec {
    DagPb,
    Raw,
    Json,
    DagJson,
}

impl ContentCodec {
    pub const fn code(self) -> u64 {
        match self {
            ContentCodec::DagPb => 0x70,
            ContentCodec::Raw => 0x55,
            ContentCodec::Json => 0x0200,
            ContentCodec::DagJson => 0x0129,
        }
    }

    pub fn from_code(code: u64) -> Result<Self> {
        match code {
            0x70 => Ok(ContentCodec::DagPb),
            0x55 => Ok(ContentCodec::Raw),
            0x0200 => Ok(ContentCodec::Json),
            0x0129 => Ok(ContentCodec::DagJson),
            other => Err(CodecError::UnsupportedCodec(other)),
        }
    }
}

/// The storage network's own address for a piece of content.
///
/// Always wraps a sha2-256 multihash with a 32 byte digest, so every address maps back to exactly one
/// [`ContentIdentifier`]. Displays as the canonical CID string (`Qm...` for v0, base32 `b...` for v1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeAddress(Cid);

impl NativeAddress {
    pub fn cid(&self) -> &Cid {
        &self.0
    }

    pub fn version(&self) -> Version {
        self.0.version()
    }

    /// The content codec; always dag-pb for v0 addresses.
    pub fn codec(&self) -> ContentCodec {
        // Codes were checked on construction.
        ContentCodec::from_code(self.0.codec()).unwrap_or(ContentCodec::DagPb)
    }

    pub fn digest(&self) -> &[u8] {
        self.0.hash().digest()
    }

    fn from_checked_cid(cid: Cid) -> Result<Self> {
        let hash = cid.hash();
        if hash.code() != SHA2_256 {
            return Err(CodecError::UnsupportedHash(hash.code()));
        }
        if hash.digest().len() != IDENTIFIER_LEN {
            return Err(CodecError::UnsupportedDigestLength(hash.digest().len()));
        }
        if cid.version() == Version::V1 {
            ContentCodec::from_code(cid.codec())?;
        }
        Ok(Self(cid))
    }
}

impl FromStr for NativeAddress {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix("/ipfs/").unwrap_or(s);
        let cid = Cid::try_from(s).map_err(|e| CodecError::InvalidAddress {
            address: s.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_checked_cid(cid)
    }
}

impl TryFrom<Cid> for NativeAddress {
    type Error = CodecError;

    fn try_from(cid: Cid) -> Result<Self> {
        Self::from_checked_cid(cid)
    }
}

impl fmt::Display for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeAddress({})", self.0)
    }
}

impl Serialize for NativeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NativeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

fn sha2_256_multihash(identifier: &ContentIdentifier) -> Result<Multihash<64>> {
    Multihash::<64>::wrap(SHA2_256, identifier.as_bytes()).map_err(|e| CodecError::InvalidAddress {
        address: identifier.to_string(),
        reason: e.to_string(),
    })
}

/// Convert an identifier into a CIDv0 address: the digest framed as a sha2-256 multihash (`0x12 0x20` header) and
/// base58btc encoded.
pub fn encode(identifier: &ContentIdentifier) -> Result<NativeAddress> {
    let cid = Cid::new_v0(sha2_256_multihash(identifier)?).map_err(|e| CodecError::InvalidAddress {
        address: identifier.to_string(),
        reason: e.to_string(),
    })?;
    Ok(NativeAddress(cid))
}

/// Convert an identifier into a CIDv1 address with the given content codec.
pub fn encode_v1(identifier: &ContentIdentifier, codec: ContentCodec) -> Result<NativeAddress> {
    Ok(NativeAddress(Cid::new_v1(codec.code(), sha2_256_multihash(identifier)?)))
}

/// Recover the identifier from an address string. Accepts CIDv0 and CIDv1, optionally prefixed with `/ipfs/`.
pub fn decode(address: &str) -> Result<ContentIdentifier> {
    let address: NativeAddress = address.parse()?;
    identifier_of(&address)
}

/// Recover the identifier from an already parsed address.
pub fn identifier_of(address: &NativeAddress) -> Result<ContentIdentifier> {
    ContentIdentifier::try_from(address.digest())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST_HEX: &str = "0x9d6c2be50f706953479ab9df2ce3edca90b68053c00b3004b7f0accbe1e8eedf";
    const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const CID_V1_DAG_PB: &str = "bafybeie5nqv6kd3qnfjupgvz34woh3oksc3iau6abmyajn7qvtf6d2ho34";
    const CID_V1_RAW: &str = "bafkreie5nqv6kd3qnfjupgvz34woh3oksc3iau6abmyajn7qvtf6d2ho34";

    fn known_id() -> ContentIdentifier {
        ContentIdentifier::from_hex(DIGEST_HEX).unwrap()
    }

    #[test]
    fn test_encode_known_vector() {
        let address = encode(&known_id()).unwrap();
        assert_eq!(address.to_string(), CID_V0);
        assert_eq!(address.version(), Version::V0);
        assert_eq!(address.codec(), ContentCodec::DagPb);
    }

    #[test]
    fn test_zero_digest() {
        let address = encode(&ContentIdentifier::from_bytes([0u8; 32])).unwrap();
        assert_eq!(address.to_string(), "QmNLei78zWmzUdbeRB3CiUfAizWUrbeeZh5K1rhAQKCh51");
    }

    #[test]
    fn test_encode_v1_known_vectors() {
        assert_eq!(encode_v1(&known_id(), ContentCodec::DagPb).unwrap().to_string(), CID_V1_DAG_PB);
        assert_eq!(encode_v1(&known_id(), ContentCodec::Raw).unwrap().to_string(), CID_V1_RAW);
    }

    #[test]
    fn test_decode_all_forms() {
        for address in [CID_V0, CID_V1_DAG_PB, CID_V1_RAW] {
            assert_eq!(decode(address).unwrap(), known_id(), "{address}");
        }
        assert_eq!(decode(&format!("/ipfs/{CID_V0}")).unwrap(), known_id());
    }

    #[test]
    fn test_round_trip() {
        let ids = [
            ContentIdentifier::from_bytes([0u8; 32]),
            ContentIdentifier::from_bytes([0xff; 32]),
            ContentIdentifier::from_bytes(std::array::from_fn(|i| i as u8)),
            known_id(),
        ];

        for id in ids {
            let address = encode(&id).unwrap();
            assert_eq!(decode(&address.to_string()).unwrap(), id);
            assert_eq!(identifier_of(&address).unwrap(), id);

            // Same input, same address.
            assert_eq!(encode(&id).unwrap(), address);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(""), Err(CodecError::InvalidAddress { .. })));
        assert!(matches!(decode("not a cid"), Err(CodecError::InvalidAddress { .. })));
        // Truncated v0
        assert!(matches!(decode(&CID_V0[..40]), Err(CodecError::InvalidAddress { .. })));
        // Unknown multibase prefix
        assert!(matches!(decode("!afybeie5nqv6kd3qnfjupgvz34woh3oksc3iau6abmyajn7qvtf6d2ho34"), Err(_)));
    }

    #[test]
    fn test_decode_rejects_unsupported_hash() {
        // sha3-256 multihash over the same digest bytes
        let mh = Multihash::<64>::wrap(0x16, known_id().as_bytes()).unwrap();
        let cid = Cid::new_v1(ContentCodec::Raw.code(), mh);
        assert_eq!(decode(&cid.to_string()).unwrap_err(), CodecError::UnsupportedHash(0x16));
    }

    #[test]
    fn test_decode_rejects_short_digest() {
        let mh = Multihash::<64>::wrap(SHA2_256, &[1u8; 20]).unwrap();
        let cid = Cid::new_v1(ContentCodec::Raw.code(), mh);
        assert_eq!(decode(&cid.to_string()).unwrap_err(), CodecError::UnsupportedDigestLength(20));
    }

    #[test]
    fn test_decode_rejects_unsupported_codec() {
        let mh = Multihash::<64>::wrap(SHA2_256, known_id().as_bytes()).unwrap();
        // dag-cbor
        let cid = Cid::new_v1(0x71, mh);
        assert_eq!(decode(&cid.to_string()).unwrap_err(), CodecError::UnsupportedCodec(0x71));
    }
}
