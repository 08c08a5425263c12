//! Solidity ABI encoding for the three registry functions.
//!
//! ```solidity
//! function issue(address subject, bytes32 vcHash, string calldata locator) external;
//! function getCount(address subject) external view returns (uint256);
//! function getCred(address subject, uint256 index) external view
//!     returns (address issuer, bytes32 hash, string memory locator, uint256 issuedAt, bool revoked);
//! ```
//!
//! Only the shapes these functions use are supported: static 32-byte words
//! and a single dynamic `string`.

use credchain_core::{keccak256, Address, CredentialHash, Timestamp};

use crate::record::{locator_from_ledger, CredentialRecord};

/// Signature of the write function.
pub const ISSUE_SIGNATURE: &str = "issue(address,bytes32,string)";
/// Signature of the count view.
pub const GET_COUNT_SIGNATURE: &str = "getCount(address)";
/// Signature of the record view.
pub const GET_CRED_SIGNATURE: &str = "getCred(address,uint256)";

const WORD: usize = 32;

/// ABI decoding failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("return data truncated: need {needed} bytes, have {len}")]
    Truncated { needed: usize, len: usize },
    #[error("word at offset {0} does not fit the target type")]
    Overflow(usize),
    #[error("dynamic offset {0} points outside the return data")]
    BadOffset(usize),
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    #[error("bool word has value other than 0 or 1")]
    InvalidBool,
}

/// First four bytes of the Keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `getCount(subject)`.
pub fn encode_get_count(subject: &Address) -> Vec<u8> {
    let mut out = selector(GET_COUNT_SIGNATURE).to_vec();
    out.extend_from_slice(&address_word(subject));
    out
}

/// Calldata for `getCred(subject, index)`.
pub fn encode_get_cred(subject: &Address, index: u64) -> Vec<u8> {
    let mut out = selector(GET_CRED_SIGNATURE).to_vec();
    out.extend_from_slice(&address_word(subject));
    out.extend_from_slice(&uint_word(u128::from(index)));
    out
}

/// Calldata for `issue(subject, hash, locator)`. An absent locator is
/// encoded as the empty string.
pub fn encode_issue(subject: &Address, hash: &CredentialHash, locator: &str) -> Vec<u8> {
    let mut out = selector(ISSUE_SIGNATURE).to_vec();
    out.extend_from_slice(&address_word(subject));
    out.extend_from_slice(hash.as_bytes());
    // Head is three words; the string tail starts right after it.
    out.extend_from_slice(&uint_word((3 * WORD) as u128));
    out.extend_from_slice(&uint_word(locator.len() as u128));
    out.extend_from_slice(locator.as_bytes());
    let pad = (WORD - locator.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(pad));
    out
}

/// Decode a single `uint256` return value that must fit in a `u64`.
pub fn decode_u64(data: &[u8]) -> Result<u64, AbiError> {
    read_u64(data, 0)
}

/// Decode the `getCred` return tuple.
pub fn decode_credential(data: &[u8]) -> Result<CredentialRecord, AbiError> {
    let issuer = read_address(data, 0)?;
    let hash = CredentialHash::from_bytes(read_word(data, WORD)?);
    let locator_offset = read_usize(data, 2 * WORD)?;
    let issued_at_secs = read_u64(data, 3 * WORD)?;
    let revoked = match read_u64(data, 4 * WORD)? {
        0 => false,
        1 => true,
        _ => return Err(AbiError::InvalidBool),
    };
    let locator = read_string(data, locator_offset)?;
    let issued_at =
        Timestamp::from_unix_seconds(issued_at_secs).ok_or(AbiError::Overflow(3 * WORD))?;
    Ok(CredentialRecord {
        issuer,
        hash,
        locator: locator_from_ledger(locator),
        issued_at,
        revoked,
    })
}

fn address_word(address: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; WORD], AbiError> {
    let end = offset + WORD;
    let slice = data.get(offset..end).ok_or(AbiError::Truncated {
        needed: end,
        len: data.len(),
    })?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(slice);
    Ok(word)
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64, AbiError> {
    let word = read_word(data, offset)?;
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(offset));
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(tail))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    usize::try_from(read_u64(data, offset)?).map_err(|_| AbiError::Overflow(offset))
}

fn read_address(data: &[u8], offset: usize) -> Result<Address, AbiError> {
    let word = read_word(data, offset)?;
    if word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(offset));
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address::from_bytes(bytes))
}

fn read_string(data: &[u8], offset: usize) -> Result<String, AbiError> {
    if offset > data.len() {
        return Err(AbiError::BadOffset(offset));
    }
    let len = read_usize(data, offset)?;
    let start = offset + WORD;
    let end = start.checked_add(len).ok_or(AbiError::BadOffset(offset))?;
    let bytes = data.get(start..end).ok_or(AbiError::Truncated {
        needed: end,
        len: data.len(),
    })?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
}
