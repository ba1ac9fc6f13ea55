//! ABI codec for the signed rebase payload.
//!
//! Four 32-byte big-endian words: `sequenceNumber`, `isNatural`,
//! `underlyingValue`, `trancheXValue`. The signer signs the Blake2b digest
//! of exactly these 128 bytes, so decoding is strict: any word that does not
//! fit its Rust type is rejected rather than truncated.

use tranche_types::RebaseRecord;

use crate::error::SequencerError;

const WORD: usize = 32;

/// Length of an encoded payload.
pub const PAYLOAD_LEN: usize = 4 * WORD;

pub fn encode_payload(record: &RebaseRecord) -> [u8; PAYLOAD_LEN] {
    let mut out = [0u8; PAYLOAD_LEN];
    put_word(&mut out[..WORD], record.sequence_number as u128);
    put_word(&mut out[WORD..2 * WORD], record.is_natural as u128);
    put_word(&mut out[2 * WORD..3 * WORD], record.underlying_value);
    put_word(&mut out[3 * WORD..], record.tranche_x_value);
    out
}

pub fn decode_payload(bytes: &[u8]) -> Result<RebaseRecord, SequencerError> {
    if bytes.len() != PAYLOAD_LEN {
        return Err(SequencerError::MalformedPayload(format!(
            "expected {PAYLOAD_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let words: Vec<&[u8]> = bytes.chunks_exact(WORD).collect();

    let sequence_number = u64::try_from(read_word(words[0], "sequenceNumber")?).map_err(|_| {
        SequencerError::MalformedPayload("sequenceNumber does not fit in 64 bits".into())
    })?;
    let is_natural = match read_word(words[1], "isNatural")? {
        0 => false,
        1 => true,
        other => {
            return Err(SequencerError::MalformedPayload(format!(
                "isNatural must be 0 or 1, got {other}"
            )))
        }
    };

    Ok(RebaseRecord {
        sequence_number,
        is_natural,
        underlying_value: read_word(words[2], "underlyingValue")?,
        tranche_x_value: read_word(words[3], "trancheXValue")?,
    })
}

fn put_word(slot: &mut [u8], value: u128) {
    slot[WORD - 16..].copy_from_slice(&value.to_be_bytes());
}

fn read_word(word: &[u8], field: &str) -> Result<u128, SequencerError> {
    let (high, low) = word.split_at(WORD - 16);
    if high.iter().any(|b| *b != 0) {
        return Err(SequencerError::MalformedPayload(format!(
            "{field} exceeds 128 bits (word {})",
            hex::encode(word)
        )));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(low);
    Ok(u128::from_be_bytes(buf))
}
