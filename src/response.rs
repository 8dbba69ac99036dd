use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::errors::{Error, Result};

/// How a successful response body should be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    Binary,
    FormData,
    Stream,
    Raw,
}

impl ResponseType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ResponseType::Json => "json",
            ResponseType::Text => "text",
            ResponseType::Binary => "binary",
            ResponseType::FormData => "formData",
            ResponseType::Stream => "stream",
            ResponseType::Raw => "raw",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            "binary" | "blob" | "arrayBuffer" => Ok(ResponseType::Binary),
            "formData" => Ok(ResponseType::FormData),
            "stream" => Ok(ResponseType::Stream),
            "raw" => Ok(ResponseType::Raw),
            other => Err(Error::UnsupportedResponseType(other.to_string())),
        }
    }
}

/// Decoded body of a successful response.
#[derive(Debug)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Binary(Bytes),
    FormData(Vec<(String, String)>),
    Stream(BodyStream),
    Raw(Response),
}

impl ResponseBody {
    pub fn response_type(&self) -> ResponseType {
        match self {
            ResponseBody::Json(_) => ResponseType::Json,
            ResponseBody::Text(_) => ResponseType::Text,
            ResponseBody::Binary(_) => ResponseType::Binary,
            ResponseBody::FormData(_) => ResponseType::FormData,
            ResponseBody::Stream(_) => ResponseType::Stream,
            ResponseBody::Raw(_) => ResponseType::Raw,
        }
    }

    pub fn into_json(self) -> Option<serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            ResponseBody::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_form(self) -> Option<Vec<(String, String)>> {
        match self {
            ResponseBody::FormData(pairs) => Some(pairs),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<BodyStream> {
        match self {
            ResponseBody::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn into_raw(self) -> Option<Response> {
        match self {
            ResponseBody::Raw(response) => Some(response),
            _ => None,
        }
    }

    /// Deserializes a JSON body into `T`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            ResponseBody::Json(value) => serde_json::from_value(value).map_err(|err| Error::Decode {
                kind: "json",
                source: Box::new(err),
            }),
            other => Err(Error::Decode {
                kind: "json",
                source: format!("expected a json body, got {}", other.response_type()).into(),
            }),
        }
    }
}

/// Chunked access to a response body that has not been read yet.
#[derive(Debug)]
pub struct BodyStream {
    response: Response,
}

impl BodyStream {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.response.chunk().await.map_err(|err| Error::Decode {
            kind: "stream",
            source: Box::new(err),
        })
    }

    /// Reads the remaining chunks into one buffer.
    pub async fn collect(mut self) -> Result<Bytes> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }
}

/// Decodes a completed response according to `response_type`.
///
/// Any non-2xx status becomes [`Error::HttpStatus`] before decoding.
pub async fn dispatch(response: Response, response_type: ResponseType) -> Result<ResponseBody> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }
    let body = match response_type {
        ResponseType::Json => {
            let bytes = read_body(response, "json").await?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                ResponseBody::Json(serde_json::Value::Null)
            } else {
                let value = serde_json::from_slice(&bytes).map_err(|err| Error::Decode {
                    kind: "json",
                    source: Box::new(err),
                })?;
                ResponseBody::Json(value)
            }
        }
        ResponseType::Text => {
            let text = response.text().await.map_err(|err| Error::Decode {
                kind: "text",
                source: Box::new(err),
            })?;
            ResponseBody::Text(text)
        }
        ResponseType::Binary => ResponseBody::Binary(read_body(response, "binary").await?),
        ResponseType::FormData => {
            let bytes = read_body(response, "formData").await?;
            let pairs = url::form_urlencoded::parse(&bytes).into_owned().collect();
            ResponseBody::FormData(pairs)
        }
        ResponseType::Stream => ResponseBody::Stream(BodyStream { response }),
        ResponseType::Raw => ResponseBody::Raw(response),
    };
    Ok(body)
}

/// Turns a non-2xx response into [`Error::HttpStatus`], keeping a JSON body if there is one.
pub(crate) async fn status_error(response: Response) -> Error {
    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();
    let body = response
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok());
    Error::HttpStatus {
        status,
        status_text,
        body,
    }
}

async fn read_body(response: Response, kind: &'static str) -> Result<Bytes> {
    response.bytes().await.map_err(|err| Error::Decode {
        kind,
        source: Box::new(err),
    })
}
