//! Minimal contract ABI codec.
//!
//! Covers the value types the script contract uses: `uint256` (restricted to
//! values that fit in `u64`), `bool`, `bytes32` and `string`. Values are
//! encoded with the standard head/tail layout; every word is 32 bytes.

use sha3::{Digest, Keccak256};

/// Size of one ABI word.
pub const WORD: usize = 32;

/// Function selector: the first four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// An ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Uint(u64),
    Bool(bool),
    Bytes32([u8; 32]),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Self::String(_))
    }
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode a tuple of values with the head/tail layout.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let mut head = Vec::with_capacity(tokens.len() * WORD);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::Bool(b) => head.extend_from_slice(&uint_word(u64::from(*b))),
            Token::Bytes32(bytes) => head.extend_from_slice(bytes),
            Token::String(s) => {
                let offset = tokens.len() * WORD + tail.len();
                head.extend_from_slice(&uint_word(offset as u64));
                tail.extend_from_slice(&uint_word(s.len() as u64));
                tail.extend_from_slice(s.as_bytes());
                let padding = (WORD - s.len() % WORD) % WORD;
                tail.resize(tail.len() + padding, 0);
            }
        }
    }

    debug_assert!(tokens.iter().any(Token::is_dynamic) || tail.is_empty());
    head.extend_from_slice(&tail);
    head
}

/// Encode call data: selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode(args));
    data
}

/// Reads values out of ABI-encoded return data.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], String> {
        offset
            .checked_add(WORD)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                format!(
                    "word at byte {offset} out of bounds (data is {} bytes)",
                    self.data.len()
                )
            })
    }

    fn u64_at(&self, offset: usize) -> Result<u64, String> {
        let word = self.word_at(offset)?;
        if word[..WORD - 8].iter().any(|b| *b != 0) {
            return Err(format!("uint at byte {offset} does not fit in 64 bits"));
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&word[WORD - 8..]);
        Ok(u64::from_be_bytes(tail))
    }

    /// `uint256` in head slot `index`.
    pub fn uint(&self, index: usize) -> Result<u64, String> {
        self.u64_at(index * WORD)
    }

    /// `bool` in head slot `index`.
    pub fn boolean(&self, index: usize) -> Result<bool, String> {
        match self.uint(index)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(format!("bool in slot {index} has value {other}")),
        }
    }

    /// `bytes32` in head slot `index`.
    pub fn bytes32(&self, index: usize) -> Result<[u8; 32], String> {
        let word = self.word_at(index * WORD)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(word);
        Ok(out)
    }

    /// `string` whose offset is in head slot `index`.
    pub fn string(&self, index: usize) -> Result<String, String> {
        let offset = usize::try_from(self.uint(index)?)
            .map_err(|_| format!("string offset in slot {index} overflows"))?;
        let len = usize::try_from(self.u64_at(offset)?)
            .map_err(|_| format!("string length in slot {index} overflows"))?;
        let start = offset + WORD;
        let bytes = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| format!("string in slot {index} runs past end of data"))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| format!("string in slot {index} is not UTF-8: {e}"))
    }
}
