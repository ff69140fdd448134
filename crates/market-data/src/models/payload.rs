use std::borrow::Cow;

use chrono::{DateTime, Utc};

use super::symbol::Symbol;
use super::types::ProviderId;

/// Character encoding a provider serves its bodies in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    #[default]
    Utf8,
    /// GBK superset used by the Sina and Tencent text services.
    Gb18030,
}

/// Response body of one transport call, handed straight to an adapter.
#[derive(Clone, Debug)]
pub struct RawPayload {
    pub provider: ProviderId,
    pub symbol: Symbol,
    pub status: u16,
    pub body: Vec<u8>,
    pub charset: Charset,
    pub fetched_at: DateTime<Utc>,
}

impl RawPayload {
    pub fn new(
        provider: ProviderId,
        symbol: Symbol,
        status: u16,
        body: impl Into<Vec<u8>>,
        charset: Charset,
    ) -> Self {
        Self {
            provider,
            symbol,
            status,
            body: body.into(),
            charset,
            fetched_at: Utc::now(),
        }
    }

    /// Decode the body. Undecodable bytes become U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        match self.charset {
            Charset::Utf8 => String::from_utf8_lossy(&self.body),
            Charset::Gb18030 => {
                let (text, _, _) = encoding_rs::GB18030.decode(&self.body);
                text
            }
        }
    }
}
