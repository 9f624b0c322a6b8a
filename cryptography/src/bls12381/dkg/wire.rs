//! Messages exchanged during a dealing.
//!
//! Every message starts with a one-byte [Tag] followed by a tag-specific payload. Lengths
//! are fixed and checked exactly, so peers running any implementation must agree on them
//! bit-for-bit:
//!
//! | Message              | Channel   | Layout                                   |
//! |----------------------|-----------|------------------------------------------|
//! | `Share`              | private   | `tag ‖ scalar (32)`                      |
//! | `VerificationVector` | broadcast | `tag ‖ (threshold + 1) × G2 (96)`        |
//! | `Complaint`          | broadcast | `tag ‖ complainee (1)`                   |
//! | `ComplaintAnswer`    | broadcast | `tag ‖ complainer (1) ‖ scalar (32)`     |

use crate::bls12381::primitives::{
    group::{Element, Scalar, G2_ELEMENT_BYTE_LENGTH, SCALAR_LENGTH},
    poly,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Length of a complaint payload (excluding the tag).
pub const COMPLAINT_LENGTH: usize = 1;

/// Length of a complaint answer payload (excluding the tag).
pub const COMPLAINT_ANSWER_LENGTH: usize = 1 + SCALAR_LENGTH;

/// Length of a share payload (excluding the tag).
pub const SHARE_LENGTH: usize = SCALAR_LENGTH;

/// Errors that can occur when decoding a message from a peer.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("message is empty")]
    Empty,
    #[error("unknown tag: {0}")]
    UnknownTag(u8),
    #[error("unexpected tag: expected {expected:?}, got {actual:#04x}")]
    UnexpectedTag { expected: Tag, actual: u8 },
    #[error("invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid participant: {index} (size {size})")]
    InvalidParticipant { index: u32, size: u32 },
    #[error("invalid scalar")]
    InvalidScalar,
    #[error("zero scalar")]
    ZeroScalar,
    #[error("invalid verification vector point")]
    InvalidPoint,
}

/// Message tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Share = 0,
    VerificationVector = 1,
    Complaint = 2,
    ComplaintAnswer = 3,
}

impl TryFrom<u8> for Tag {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Tag::Share),
            1 => Ok(Tag::VerificationVector),
            2 => Ok(Tag::Complaint),
            3 => Ok(Tag::ComplaintAnswer),
            tag => Err(Error::UnknownTag(tag)),
        }
    }
}

/// Splits a message into its tag and payload.
pub fn split(msg: &[u8]) -> Result<(Tag, &[u8]), Error> {
    let (tag, payload) = msg.split_first().ok_or(Error::Empty)?;
    Ok((Tag::try_from(*tag)?, payload))
}

fn check_length(payload: &[u8], expected: usize) -> Result<(), Error> {
    if payload.len() != expected {
        return Err(Error::InvalidLength {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn read_index(buf: &mut impl Buf, size: u32) -> Result<u32, Error> {
    let index = buf.get_u8() as u32;
    if index >= size {
        return Err(Error::InvalidParticipant { index, size });
    }
    Ok(index)
}

/// Reads a non-zero scalar (shares and answers are never zero).
fn read_scalar(buf: &mut impl Buf) -> Result<Scalar, Error> {
    let mut bytes = [0u8; SCALAR_LENGTH];
    buf.copy_to_slice(&mut bytes);
    let scalar = Scalar::deserialize(&bytes).ok_or(Error::InvalidScalar)?;
    if scalar.is_zero() {
        return Err(Error::ZeroScalar);
    }
    Ok(scalar)
}

/// Encodes a private share.
pub fn share(private: &Scalar) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + SHARE_LENGTH);
    buf.put_u8(Tag::Share as u8);
    buf.put_slice(&private.serialize());
    buf.freeze()
}

/// Decodes a private share (the entire message, including the tag).
pub fn decode_share(msg: &[u8]) -> Result<Scalar, Error> {
    let (tag, payload) = msg.split_first().ok_or(Error::Empty)?;
    if *tag != Tag::Share as u8 {
        return Err(Error::UnexpectedTag {
            expected: Tag::Share,
            actual: *tag,
        });
    }
    check_length(payload, SHARE_LENGTH)?;
    let mut buf = payload;
    read_scalar(&mut buf)
}

/// Encodes a verification vector.
pub fn verification_vector(commitment: &poly::Public) -> Bytes {
    let serialized = commitment.serialize();
    let mut buf = BytesMut::with_capacity(1 + serialized.len());
    buf.put_u8(Tag::VerificationVector as u8);
    buf.put_slice(&serialized);
    buf.freeze()
}

/// Decodes a verification vector payload committing to a polynomial of degree `threshold`.
pub fn decode_verification_vector(payload: &[u8], threshold: u32) -> Result<poly::Public, Error> {
    let required = threshold + 1;
    check_length(payload, G2_ELEMENT_BYTE_LENGTH * required as usize)?;
    poly::Public::deserialize(payload, required).ok_or(Error::InvalidPoint)
}

/// Encodes a complaint against `complainee`.
pub fn complaint(complainee: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + COMPLAINT_LENGTH);
    buf.put_u8(Tag::Complaint as u8);
    buf.put_u8(complainee as u8);
    buf.freeze()
}

/// Decodes a complaint payload, returning the complainee.
pub fn decode_complaint(payload: &[u8], size: u32) -> Result<u32, Error> {
    check_length(payload, COMPLAINT_LENGTH)?;
    let mut buf = payload;
    read_index(&mut buf, size)
}

/// Encodes an answer to the complaint of `complainer`, revealing its share.
pub fn complaint_answer(complainer: u32, private: &Scalar) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + COMPLAINT_ANSWER_LENGTH);
    buf.put_u8(Tag::ComplaintAnswer as u8);
    buf.put_u8(complainer as u8);
    buf.put_slice(&private.serialize());
    buf.freeze()
}

/// Decodes a complaint answer payload, returning the complainer and the revealed share.
pub fn decode_complaint_answer(payload: &[u8], size: u32) -> Result<(u32, Scalar), Error> {
    check_length(payload, COMPLAINT_ANSWER_LENGTH)?;
    let mut buf = payload;
    let complainer = read_index(&mut buf, size)?;
    let private = read_scalar(&mut buf)?;
    Ok((complainer, private))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bls12381::primitives::group::G2;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_split() {
        assert_eq!(split(&[]), Err(Error::Empty));
        assert_eq!(split(&[4]), Err(Error::UnknownTag(4)));
        assert_eq!(split(&[0xff, 1, 2]), Err(Error::UnknownTag(0xff)));
        let (tag, payload) = split(&[2, 7]).unwrap();
        assert_eq!(tag, Tag::Complaint);
        assert_eq!(payload, &[7]);
    }

    #[test]
    fn test_share() {
        let mut rng = StdRng::seed_from_u64(0);
        let private = Scalar::rand(&mut rng);
        let msg = share(&private);
        assert_eq!(msg.len(), 1 + SHARE_LENGTH);
        assert_eq!(msg[0], Tag::Share as u8);
        assert_eq!(decode_share(&msg).unwrap(), private);

        // Missing tag
        assert_eq!(decode_share(&[]), Err(Error::Empty));

        // Wrong tag
        let mut wrong = msg.to_vec();
        wrong[0] = Tag::Complaint as u8;
        assert_eq!(
            decode_share(&wrong),
            Err(Error::UnexpectedTag {
                expected: Tag::Share,
                actual: Tag::Complaint as u8
            })
        );

        // Truncated
        assert_eq!(
            decode_share(&msg[..msg.len() - 1]),
            Err(Error::InvalidLength {
                expected: SHARE_LENGTH,
                actual: SHARE_LENGTH - 1
            })
        );

        // Zero
        let mut zero = vec![Tag::Share as u8];
        zero.extend_from_slice(&[0u8; SCALAR_LENGTH]);
        assert_eq!(decode_share(&zero), Err(Error::ZeroScalar));

        // Not canonical
        let mut large = vec![Tag::Share as u8];
        large.extend_from_slice(&[0xff; SCALAR_LENGTH]);
        assert_eq!(decode_share(&large), Err(Error::InvalidScalar));
    }

    #[test]
    fn test_verification_vector() {
        let mut rng = StdRng::seed_from_u64(1);
        let commitment = poly::Public::commit(&poly::new_from(2, &mut rng));
        let msg = verification_vector(&commitment);
        let (tag, payload) = split(&msg).unwrap();
        assert_eq!(tag, Tag::VerificationVector);
        assert_eq!(payload.len(), 3 * G2_ELEMENT_BYTE_LENGTH);
        assert_eq!(
            decode_verification_vector(payload, 2).unwrap(),
            commitment
        );

        // Threshold mismatch
        assert_eq!(
            decode_verification_vector(payload, 1),
            Err(Error::InvalidLength {
                expected: 2 * G2_ELEMENT_BYTE_LENGTH,
                actual: 3 * G2_ELEMENT_BYTE_LENGTH
            })
        );

        // Invalid point
        let mut corrupted = payload.to_vec();
        corrupted[..G2_ELEMENT_BYTE_LENGTH].copy_from_slice(&[0xaa; G2_ELEMENT_BYTE_LENGTH]);
        assert_eq!(
            decode_verification_vector(&corrupted, 2),
            Err(Error::InvalidPoint)
        );

        // Identity commitments decode
        let identity = poly::Public::from(vec![G2::zero(), G2::zero()]);
        let msg = verification_vector(&identity);
        assert_eq!(
            decode_verification_vector(&msg[1..], 1).unwrap(),
            identity
        );
    }

    #[test]
    fn test_complaint() {
        let msg = complaint(3);
        assert_eq!(&msg[..], &[Tag::Complaint as u8, 3]);
        assert_eq!(decode_complaint(&msg[1..], 4).unwrap(), 3);
        assert_eq!(
            decode_complaint(&msg[1..], 3),
            Err(Error::InvalidParticipant { index: 3, size: 3 })
        );
        assert_eq!(
            decode_complaint(&[1, 2], 4),
            Err(Error::InvalidLength {
                expected: COMPLAINT_LENGTH,
                actual: 2
            })
        );
    }

    #[test]
    fn test_complaint_answer() {
        let mut rng = StdRng::seed_from_u64(2);
        let private = Scalar::rand(&mut rng);
        let msg = complaint_answer(2, &private);
        assert_eq!(msg.len(), 2 + SCALAR_LENGTH);
        let (tag, payload) = split(&msg).unwrap();
        assert_eq!(tag, Tag::ComplaintAnswer);
        assert_eq!(decode_complaint_answer(payload, 4).unwrap(), (2, private));

        // Complainer out of range
        assert_eq!(
            decode_complaint_answer(payload, 2),
            Err(Error::InvalidParticipant { index: 2, size: 2 })
        );

        // Truncated
        assert_eq!(
            decode_complaint_answer(&payload[..5], 4),
            Err(Error::InvalidLength {
                expected: COMPLAINT_ANSWER_LENGTH,
                actual: 5
            })
        );

        // Zero share
        let mut zero = vec![1u8];
        zero.extend_from_slice(&[0u8; SCALAR_LENGTH]);
        assert_eq!(decode_complaint_answer(&zero, 4), Err(Error::ZeroScalar));
    }
}
