//! Attestation signing message
//!
//! The exact bytes an issuer signs. External issuer services build the same
//! buffer, so the layout is fixed:
//!
//! | offset | len | field |
//! |-------:|----:|-------|
//! | 0   | 24 | `"humanrail:attestation:v1"` |
//! | 24  | 32 | profile id |
//! | 56  | 32 | issuer id |
//! | 88  | 32 | payload hash |
//! | 120 | 2  | weight (u16 LE) |
//! | 122 | 8  | issued_at (i64 LE) |
//! | 130 | 8  | expires_at (i64 LE) |
//! | 138 | 8  | nonce (u64 LE) |

use humanrail_core::{Hash32, IssuerId, ProfileId, RailError, RailResult};
use serde::{Deserialize, Serialize};

/// Domain separator prefix.
pub const DOMAIN_SEPARATOR: &[u8; 24] = b"humanrail:attestation:v1";

/// Length of the encoded message.
pub const SIGNING_MESSAGE_LEN: usize = 146;

/// Fields covered by an issuer signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationMessage {
    /// Profile the claim is about
    pub profile: ProfileId,
    /// Issuer making the claim
    pub issuer: IssuerId,
    /// Commitment to off-chain evidence
    pub payload_hash: Hash32,
    /// Asserted weight
    pub weight: u16,
    /// Issue time
    pub issued_at: i64,
    /// Expiry time
    pub expires_at: i64,
    /// Replay key, scoped to `(profile, issuer)`
    pub nonce: u64,
}

struct Writer<'a> {
    buf: &'a mut [u8; SIGNING_MESSAGE_LEN],
    pos: usize,
}

impl Writer<'_> {
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }
}

impl AttestationMessage {
    /// Canonical signing bytes. Pure and deterministic.
    pub fn encode(&self) -> [u8; SIGNING_MESSAGE_LEN] {
        let mut buf = [0u8; SIGNING_MESSAGE_LEN];
        let mut w = Writer { buf: &mut buf, pos: 0 };
        w.put(DOMAIN_SEPARATOR);
        w.put(self.profile.as_bytes());
        w.put(self.issuer.as_bytes());
        w.put(&self.payload_hash);
        w.put(&self.weight.to_le_bytes());
        w.put(&self.issued_at.to_le_bytes());
        w.put(&self.expires_at.to_le_bytes());
        w.put(&self.nonce.to_le_bytes());
        debug_assert_eq!(w.pos, SIGNING_MESSAGE_LEN);
        buf
    }

    /// Parse signing bytes back into fields.
    pub fn decode(bytes: &[u8]) -> RailResult<Self> {
        if bytes.len() != SIGNING_MESSAGE_LEN {
            return Err(RailError::malformed(format!(
                "attestation message is {} bytes, expected {SIGNING_MESSAGE_LEN}",
                bytes.len()
            )));
        }
        let mut r = Reader { buf: bytes, pos: 0 };
        let domain: [u8; 24] = r.take();
        if &domain != DOMAIN_SEPARATOR {
            return Err(RailError::malformed("unknown domain separator"));
        }
        Ok(Self {
            profile: ProfileId(r.take()),
            issuer: IssuerId(r.take()),
            payload_hash: r.take(),
            weight: u16::from_le_bytes(r.take()),
            issued_at: i64::from_le_bytes(r.take()),
            expires_at: i64::from_le_bytes(r.take()),
            nonce: u64::from_le_bytes(r.take()),
        })
    }
}
