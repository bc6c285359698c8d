//! Request and response bodies.
//!
//! A [`Body`] is either absent, a buffered chunk of bytes that can be replayed
//! any number of times, or a stream that can be read exactly once. Reading a
//! body consumes it, so a body value can never be read twice.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::io;

use crate::{Error, Result};

/// The body of a request or response.
///
/// # Examples
///
/// ```
/// use governed_http::Body;
///
/// # async fn example() -> std::io::Result<()> {
/// let body = Body::from("hello");
/// assert_eq!(body.collect().await?, "hello");
///
/// assert!(Body::empty().is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Body {
    kind: Kind,
}

enum Kind {
    Empty,
    Buffered(Bytes),
    Streaming(BoxStream<'static, io::Result<Bytes>>),
}

impl Body {
    /// A body that is absent, like a `GET` without payload.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// A body backed by a stream of chunks. It can be read only once.
    pub fn wrap_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            kind: Kind::Streaming(stream.boxed()),
        }
    }

    /// Serializes `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value).map_err(Error::Serialization)?;
        Ok(Self::from(bytes))
    }

    /// Returns `true` if the body is absent.
    ///
    /// A buffered body of zero bytes is present, just short.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::Empty)
    }

    /// Returns the bytes if this body is buffered.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            Kind::Buffered(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a copy of the body if it can be replayed.
    ///
    /// Absent and buffered bodies can; streaming bodies cannot.
    pub fn try_clone(&self) -> Option<Self> {
        match &self.kind {
            Kind::Empty => Some(Self::empty()),
            Kind::Buffered(bytes) => Some(Self::from(bytes.clone())),
            Kind::Streaming(_) => None,
        }
    }

    /// Reads the body to completion.
    ///
    /// An absent body yields no bytes.
    pub async fn collect(self) -> io::Result<Bytes> {
        match self.kind {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Buffered(bytes) => Ok(bytes),
            Kind::Streaming(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Reads the body to completion and decodes it as UTF-8, replacing invalid
    /// sequences.
    pub async fn text(self) -> io::Result<String> {
        let bytes = self.collect().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads the body to completion and deserializes it as JSON.
    pub async fn json_value<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.collect().await.map_err(Error::ResponseBodyRead)?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Deserialization {
            raw_response: String::from_utf8_lossy(&bytes).into_owned(),
            serde_error: e.to_string(),
        })
    }

    pub(crate) fn into_reqwest(self) -> Option<reqwest::Body> {
        match self.kind {
            Kind::Empty => None,
            Kind::Buffered(bytes) => Some(reqwest::Body::from(bytes)),
            Kind::Streaming(stream) => Some(reqwest::Body::wrap_stream(stream)),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("Body::Empty"),
            Kind::Buffered(bytes) => f.debug_tuple("Body::Buffered").field(&bytes.len()).finish(),
            Kind::Streaming(_) => f.write_str("Body::Streaming"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Buffered(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }
}
