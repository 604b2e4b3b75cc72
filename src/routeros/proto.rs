//! Sentence framing for the RouterOS binary API.
//!
//! A word is a length prefix followed by that many bytes. A sentence is a
//! run of words closed by an empty word. Replies start with one of `!re`,
//! `!done`, `!trap` or `!fatal`, followed by `=key=value` attribute words.

use crate::error::{ExporterError, Result};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest word we accept from a device.
const MAX_WORD_LEN: usize = 16 * 1024 * 1024;

/// Encode a word length using the API's variable-width prefix.
pub fn encode_length(len: usize, out: &mut Vec<u8>) {
    let l = len as u32;
    if len < 0x80 {
        out.push(l as u8);
    } else if len < 0x4000 {
        out.extend_from_slice(&((l | 0x8000) as u16).to_be_bytes());
    } else if len < 0x20_0000 {
        out.extend_from_slice(&(l | 0xC0_0000).to_be_bytes()[1..]);
    } else if len < 0x1000_0000 {
        out.extend_from_slice(&(l | 0xE000_0000).to_be_bytes());
    } else {
        out.push(0xF0);
        out.extend_from_slice(&l.to_be_bytes());
    }
}

/// Encode a full sentence, including the terminating empty word.
pub fn encode_sentence<S: AsRef<str>>(words: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for word in words {
        let bytes = word.as_ref().as_bytes();
        encode_length(bytes.len(), &mut out);
        out.extend_from_slice(bytes);
    }
    out.push(0);
    out
}

/// Read one length prefix.
pub async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize> {
    let first = reader.read_u8().await?;
    let (mut len, extra) = if first & 0x80 == 0 {
        (first as usize, 0)
    } else if first & 0xC0 == 0x80 {
        ((first & 0x3F) as usize, 1)
    } else if first & 0xE0 == 0xC0 {
        ((first & 0x1F) as usize, 2)
    } else if first & 0xF0 == 0xE0 {
        ((first & 0x0F) as usize, 3)
    } else if first == 0xF0 {
        (0, 4)
    } else {
        return Err(ExporterError::protocol_error(format!(
            "invalid length prefix 0x{:02x}",
            first
        )));
    };

    for _ in 0..extra {
        len = (len << 8) | reader.read_u8().await? as usize;
    }
    Ok(len)
}

/// Read one sentence as a list of words.
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>> {
    let mut words = Vec::new();
    loop {
        let len = read_length(reader).await?;
        if len == 0 {
            return Ok(words);
        }
        if len > MAX_WORD_LEN {
            return Err(ExporterError::protocol_error(format!(
                "word of {} bytes exceeds limit",
                len
            )));
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).await?;
        let word = String::from_utf8(buf)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
        words.push(word);
    }
}

/// Write one sentence and flush it.
pub async fn write_sentence<W, S>(writer: &mut W, words: &[S]) -> Result<()>
where
    W: AsyncWrite + Unpin,
    S: AsRef<str>,
{
    writer.write_all(&encode_sentence(words)).await?;
    writer.flush().await?;
    Ok(())
}

/// A reply sentence after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// The reply word, e.g. `!re`
    pub word: String,
    /// Attribute words split into key/value pairs
    pub map: HashMap<String, String>,
}

impl Sentence {
    /// Split raw words into the reply word and its attributes.
    ///
    /// Words that are not `=key=value` attributes (such as `.tag=`) are
    /// dropped. `!fatal` carries its reason as a bare word, which is kept
    /// under the `message` key.
    pub fn parse(words: Vec<String>) -> Result<Self> {
        let mut iter = words.into_iter();
        let word = iter
            .next()
            .ok_or_else(|| ExporterError::protocol_error("empty sentence"))?;
        let mut map = HashMap::new();

        for attr in iter {
            if let Some(rest) = attr.strip_prefix('=') {
                match rest.split_once('=') {
                    Some((key, value)) => map.insert(key.to_string(), value.to_string()),
                    None => map.insert(rest.to_string(), String::new()),
                };
            } else if word == "!fatal" {
                map.insert("message".to_string(), attr);
            }
        }

        Ok(Self { word, map })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }
}

/// All sentences returned for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// `!re` records in arrival order
    pub re: Vec<Sentence>,
    /// The closing `!done` sentence
    pub done: Option<Sentence>,
}
