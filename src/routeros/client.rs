//! Command/reply client and login handshake.

use crate::error::{ExporterError, Result};
use crate::routeros::proto::{read_sentence, write_sentence, Reply, Sentence};
use md5::{Digest, Md5};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// A client speaking the API over any byte stream.
pub struct Client<S> {
    stream: S,
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Send a command and read sentences until its `!done`.
    ///
    /// A `!trap` fails the command with the device's message once the
    /// closing `!done` has been consumed, leaving the connection usable.
    /// A `!fatal` fails immediately; the device closes the connection after it.
    pub async fn run<W: AsRef<str>>(&mut self, words: &[W]) -> Result<Reply> {
        write_sentence(&mut self.stream, words).await?;

        let mut reply = Reply::default();
        let mut trap: Option<String> = None;
        loop {
            let sentence = Sentence::parse(read_sentence(&mut self.stream).await?)?;
            match sentence.word.as_str() {
                "!re" => reply.re.push(sentence),
                "!done" => {
                    reply.done = Some(sentence);
                    break;
                }
                "!trap" => {
                    if trap.is_none() {
                        trap = Some(sentence.get("message").unwrap_or("trap").to_string());
                    }
                }
                "!fatal" => {
                    return Err(ExporterError::protocol_error(format!(
                        "fatal: {}",
                        sentence.get("message").unwrap_or("connection closed by device")
                    )));
                }
                other => {
                    return Err(ExporterError::protocol_error(format!(
                        "unexpected reply word {:?}",
                        other
                    )));
                }
            }
        }

        match trap {
            Some(message) => Err(ExporterError::protocol_error(format!(
                "{}: {}",
                words.first().map(AsRef::as_ref).unwrap_or(""),
                message
            ))),
            None => Ok(reply),
        }
    }

    /// Authenticate, choosing the handshake from the shape of the first reply.
    ///
    /// Firmware from 6.43 on accepts the password in the first `/login` and
    /// answers with a bare `!done`. Older firmware answers with a `ret`
    /// challenge that must be hashed together with the password and sent
    /// back in a second `/login`.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let name = format!("=name={}", user);
        let secret = format!("=password={}", password);
        let reply = self
            .run(&["/login", name.as_str(), secret.as_str()])
            .await
            .map_err(|e| ExporterError::auth_error(format!("/login: {}", e)))?;

        let done = reply
            .done
            .ok_or_else(|| ExporterError::auth_error("/login: no acknowledgement received"))?;
        let Some(ret) = done.get("ret") else {
            return Ok(());
        };

        let challenge = hex::decode(ret).map_err(|e| {
            ExporterError::auth_error(format!("/login: invalid challenge {:?}: {}", ret, e))
        })?;
        let response = format!("=response={}", challenge_response(&challenge, password));
        self.run(&["/login", name.as_str(), response.as_str()])
            .await
            .map_err(|e| ExporterError::auth_error(format!("/login: {}", e)))?;
        Ok(())
    }

    /// Shut the transport down.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Answer to a legacy login challenge:
/// `"00"` followed by lowercase hex of `MD5(0x00 || password || challenge)`.
pub fn challenge_response(challenge: &[u8], password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.update(challenge);
    format!("00{}", hex::encode(hasher.finalize()))
}
