//! The W3C DC API's wire envelope (§4.13, §6): a JSON object naming the credential protocol in
//! use, with protocol-specific payload.

use serde::Deserialize;
use serde::Serialize;

use crate::error::DcApiError;
use crate::error::Result;

/// `protocol` values this dispatcher recognizes (§6: "EXTERNAL INTERFACES / W3C DC API").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    OpenId4Vp,
    OpenId4VpV1Signed,
    OpenId4VpV1Unsigned,
    IsoMdoc,
}

impl Protocol {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "openid4vp" => Ok(Self::OpenId4Vp),
            "openid4vp-v1-signed" => Ok(Self::OpenId4VpV1Signed),
            "openid4vp-v1-unsigned" => Ok(Self::OpenId4VpV1Unsigned),
            "org.iso.mdoc" | "org-iso-mdoc" => Ok(Self::IsoMdoc),
            other => Err(DcApiError::UnsupportedProtocol(other.to_owned())),
        }
    }

    pub fn is_signed_request(self) -> bool {
        matches!(self, Self::OpenId4VpV1Signed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    pub protocol: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub protocol: String,
    pub data: ResponseData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseData {
    pub response: String,
}

/// The ISO mdoc protocol's request payload: base64url-encoded `DeviceRequest` and
/// `EncryptionInfo` CBOR blobs (§6: "data contains base64url-encoded deviceRequest and
/// encryptionInfo").
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsoMdocRequestData {
    pub device_request: String,
    pub encryption_info: String,
}

pub fn decode_base64url(field: &'static str, value: &str) -> Result<Vec<u8>> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    URL_SAFE_NO_PAD.decode(value).map_err(|_| DcApiError::InvalidBase64(field))
}

pub fn encode_base64url(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    URL_SAFE_NO_PAD.encode(bytes)
}
