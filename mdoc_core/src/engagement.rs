//! `DeviceEngagement` (§4.9): the holder-published blob a reader scans to learn how to connect
//! and which ephemeral key to use for session encryption.
//!
//! ISO/IEC 18013-5 encodes the engagement itself as a CBOR map keyed by small integers (not
//! field-name strings) and each `ConnectionMethod` as a 3-element array `[type, version,
//! options]`, with the BLE options themselves keyed by small integers too. Both shapes matter:
//! a reader built against the standard won't recognize a string-keyed engagement.

use cbor::CborIntMap;
use cbor::CborSeq;
use cbor::IntKeyed;
use cbor::TaggedBytes;
use cbor::Value;
use crypto::keys::EcPublicKey;
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use uuid::Uuid;

use crate::error::MdocError;
use crate::error::Result;

pub const VERSION_1_0: &str = "1.0";
pub const VERSION_1_1: &str = "1.1";

/// `Security` array: `[cipherSuiteIdentifier, EDeviceKeyBytes]`. Only cipher suite `1` (defined
/// by ISO/IEC 18013-5) exists today.
pub type Security = CborSeq<SecurityKeyed>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityKeyed {
    pub cipher_suite_identifier: u64,
    pub e_device_key_bytes: TaggedBytes<ciborium::value::Value>,
}

const CONNECTION_METHOD_TYPE_NFC: i64 = 1;
const CONNECTION_METHOD_TYPE_BLE: i64 = 2;
const CONNECTION_METHOD_TYPE_WIFI_AWARE: i64 = 3;
const CONNECTION_METHOD_VERSION: i64 = 1;

const BLE_OPTION_SUPPORT_PERIPHERAL_SERVER_MODE: i64 = 0;
const BLE_OPTION_SUPPORT_CENTRAL_CLIENT_MODE: i64 = 1;
const BLE_OPTION_PERIPHERAL_SERVER_MODE_UUID: i64 = 10;
const BLE_OPTION_CENTRAL_CLIENT_MODE_UUID: i64 = 11;

/// A `DeviceRetrievalMethod` (§4.9). Encoded on the wire as `[type, version, options]`, never as
/// a tagged map — the ergonomic variant names here are purely an in-memory convenience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMethod {
    BleCentralClientMode { uuid: Uuid },
    BlePeripheralServerMode { uuid: Uuid },
    Nfc,
    WifiAware,
}

fn find_bool(options: &[(Value, Value)], key: i64) -> Option<bool> {
    options.iter().find_map(|(k, v)| match (k, v) {
        (Value::Integer(i), Value::Bool(b)) if i64::try_from(*i).ok() == Some(key) => Some(*b),
        _ => None,
    })
}

fn find_uuid(options: &[(Value, Value)], key: i64) -> Option<Uuid> {
    options.iter().find_map(|(k, v)| match (k, v) {
        (Value::Integer(i), Value::Bytes(b)) if i64::try_from(*i).ok() == Some(key) => Uuid::from_slice(b).ok(),
        _ => None,
    })
}

impl Serialize for ConnectionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (type_id, options) = match self {
            ConnectionMethod::Nfc => (CONNECTION_METHOD_TYPE_NFC, Value::Map(Vec::new())),
            ConnectionMethod::WifiAware => (CONNECTION_METHOD_TYPE_WIFI_AWARE, Value::Map(Vec::new())),
            ConnectionMethod::BleCentralClientMode { uuid } => (
                CONNECTION_METHOD_TYPE_BLE,
                Value::Map(vec![
                    (Value::Integer(BLE_OPTION_SUPPORT_PERIPHERAL_SERVER_MODE.into()), Value::Bool(false)),
                    (Value::Integer(BLE_OPTION_SUPPORT_CENTRAL_CLIENT_MODE.into()), Value::Bool(true)),
                    (Value::Integer(BLE_OPTION_CENTRAL_CLIENT_MODE_UUID.into()), Value::Bytes(uuid.as_bytes().to_vec())),
                ]),
            ),
            ConnectionMethod::BlePeripheralServerMode { uuid } => (
                CONNECTION_METHOD_TYPE_BLE,
                Value::Map(vec![
                    (Value::Integer(BLE_OPTION_SUPPORT_PERIPHERAL_SERVER_MODE.into()), Value::Bool(true)),
                    (Value::Integer(BLE_OPTION_SUPPORT_CENTRAL_CLIENT_MODE.into()), Value::Bool(false)),
                    (Value::Integer(BLE_OPTION_PERIPHERAL_SERVER_MODE_UUID.into()), Value::Bytes(uuid.as_bytes().to_vec())),
                ]),
            ),
        };
        Value::Array(vec![Value::Integer(type_id.into()), Value::Integer(CONNECTION_METHOD_VERSION.into()), options]).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConnectionMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let Value::Array(mut elements) = value else {
            return Err(D::Error::custom("expected a ConnectionMethod array"));
        };
        if elements.len() != 3 {
            return Err(D::Error::custom("expected a 3-element ConnectionMethod array"));
        }
        let options = elements.remove(2);
        let _version = elements.remove(1);
        let type_id = elements.remove(0);

        let Value::Integer(type_id) = type_id else {
            return Err(D::Error::custom("connection method type must be an integer"));
        };
        let type_id: i64 = type_id.try_into().map_err(|_| D::Error::custom("connection method type out of range"))?;

        let Value::Map(options) = options else {
            return Err(D::Error::custom("connection method options must be a map"));
        };

        match type_id {
            CONNECTION_METHOD_TYPE_NFC => Ok(ConnectionMethod::Nfc),
            CONNECTION_METHOD_TYPE_WIFI_AWARE => Ok(ConnectionMethod::WifiAware),
            CONNECTION_METHOD_TYPE_BLE => {
                let central = find_bool(&options, BLE_OPTION_SUPPORT_CENTRAL_CLIENT_MODE).unwrap_or(false);
                let peripheral = find_bool(&options, BLE_OPTION_SUPPORT_PERIPHERAL_SERVER_MODE).unwrap_or(false);
                if central {
                    let uuid = find_uuid(&options, BLE_OPTION_CENTRAL_CLIENT_MODE_UUID)
                        .ok_or_else(|| D::Error::custom("missing BLE central client mode UUID"))?;
                    Ok(ConnectionMethod::BleCentralClientMode { uuid })
                } else if peripheral {
                    let uuid = find_uuid(&options, BLE_OPTION_PERIPHERAL_SERVER_MODE_UUID)
                        .ok_or_else(|| D::Error::custom("missing BLE peripheral server mode UUID"))?;
                    Ok(ConnectionMethod::BlePeripheralServerMode { uuid })
                } else {
                    Err(D::Error::custom("BLE connection method sets neither central-client nor peripheral-server mode"))
                }
            }
            other => Err(D::Error::custom(format!("unsupported connection method type `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value")]
pub enum OriginInfo {
    Website { base_url: String },
    OnDeviceQr,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_session_establishment_retry: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engagement {
    pub version: String,
    pub security: Security,
    pub device_retrieval_methods: Vec<ConnectionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_infos: Option<Vec<OriginInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

impl IntKeyed for Engagement {
    const KEYS: &'static [(&'static str, i64)] =
        &[("version", 0), ("security", 1), ("device_retrieval_methods", 2), ("origin_infos", 3), ("capabilities", 4)];
}

/// The ISO wire encoding of an engagement: an integer-keyed CBOR map, not a string-keyed struct.
pub type DeviceEngagement = CborIntMap<Engagement>;
pub type DeviceEngagementBytes = TaggedBytes<DeviceEngagement>;

impl PartialEq for DeviceEngagement {
    fn eq(&self, other: &Self) -> bool {
        cbor::cbor_serialize(self).ok() == cbor::cbor_serialize(other).ok()
    }
}

/// Builds a [`DeviceEngagement`], enforcing the version gate: origin infos and capabilities are
/// only permitted from version `"1.1"` onward (§4.9, §8: "Engagement version gate").
pub struct DeviceEngagementBuilder {
    version: String,
    e_device_key: EcPublicKey,
    device_retrieval_methods: Vec<ConnectionMethod>,
    origin_infos: Option<Vec<OriginInfo>>,
    capabilities: Option<Capabilities>,
}

impl DeviceEngagementBuilder {
    pub fn new(version: &str, e_device_key: EcPublicKey) -> Self {
        Self {
            version: version.to_owned(),
            e_device_key,
            device_retrieval_methods: Vec::new(),
            origin_infos: None,
            capabilities: None,
        }
    }

    pub fn with_connection_method(mut self, method: ConnectionMethod) -> Self {
        self.device_retrieval_methods.push(method);
        self
    }

    pub fn with_origin_info(mut self, info: OriginInfo) -> Self {
        self.origin_infos.get_or_insert_with(Vec::new).push(info);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn build(self) -> Result<DeviceEngagement> {
        if self.version == VERSION_1_0 && (self.origin_infos.is_some() || self.capabilities.is_some()) {
            return Err(MdocError::InvalidEngagement(
                "version 1.0 engagement may not carry OriginInfos or Capabilities".to_owned(),
            ));
        }

        let e_device_key_value = self.e_device_key.to_cose_key();
        Ok(CborIntMap(Engagement {
            version: self.version,
            security: CborSeq(SecurityKeyed {
                cipher_suite_identifier: 1,
                e_device_key_bytes: TaggedBytes(e_device_key_value),
            }),
            device_retrieval_methods: self.device_retrieval_methods,
            origin_infos: self.origin_infos,
            capabilities: self.capabilities,
        }))
    }
}

/// Extension methods on [`DeviceEngagement`] — a type alias for a foreign crate's
/// [`CborIntMap`], so inherent impls aren't available here.
pub trait DeviceEngagementExt {
    fn e_device_key(&self) -> Result<EcPublicKey>;
}

impl DeviceEngagementExt for DeviceEngagement {
    fn e_device_key(&self) -> Result<EcPublicKey> {
        Ok(EcPublicKey::from_cose_key(&self.0.security.0.e_device_key_bytes.0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;

    fn fresh_public_key() -> EcPublicKey {
        EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap().public_key()
    }

    fn sample_uuid() -> Uuid {
        Uuid::parse_str("45efef74-2b2c-4837-a9a3-b0e1d05a6917").unwrap()
    }

    #[test]
    fn version_1_0_rejects_origin_info() {
        let result = DeviceEngagementBuilder::new(VERSION_1_0, fresh_public_key())
            .with_origin_info(OriginInfo::OnDeviceQr)
            .build();
        assert!(matches!(result, Err(MdocError::InvalidEngagement(_))));
    }

    #[test]
    fn version_1_1_allows_origin_info() {
        let engagement = DeviceEngagementBuilder::new(VERSION_1_1, fresh_public_key())
            .with_origin_info(OriginInfo::OnDeviceQr)
            .build()
            .unwrap();
        assert_eq!(engagement.0.origin_infos.unwrap().len(), 1);
    }

    #[test]
    fn e_device_key_round_trips() {
        let key = fresh_public_key();
        let engagement = DeviceEngagementBuilder::new(VERSION_1_0, key.clone())
            .with_connection_method(ConnectionMethod::BleCentralClientMode { uuid: sample_uuid() })
            .build()
            .unwrap();
        assert_eq!(engagement.e_device_key().unwrap(), key);

        let bytes = cbor::cbor_serialize(&DeviceEngagementBytes::from(engagement.clone())).unwrap();
        let decoded: DeviceEngagementBytes = cbor::cbor_deserialize(&bytes).unwrap();
        assert_eq!(decoded.0, engagement);
    }

    /// §4.9/§8: the engagement map itself is integer-keyed, and a BLE `ConnectionMethod` is a
    /// `[type, version, options]` array with its own integer-keyed options map — not a
    /// string-tagged enum. Verified by decoding into a generic [`Value`] and checking shape.
    #[test]
    fn device_engagement_encodes_as_integer_keyed_map() {
        let engagement = DeviceEngagementBuilder::new(VERSION_1_0, fresh_public_key())
            .with_connection_method(ConnectionMethod::BleCentralClientMode { uuid: sample_uuid() })
            .build()
            .unwrap();
        let bytes = cbor::cbor_serialize(&engagement).unwrap();
        let value: Value = cbor::cbor_deserialize(&bytes).unwrap();

        let Value::Map(entries) = value else { panic!("expected a map") };
        assert!(entries.iter().all(|(k, _)| matches!(k, Value::Integer(_))), "engagement keys must be integers, got {entries:?}");
        assert!(entries.iter().any(|(k, _)| *k == Value::Integer(1.into())), "security key 1 present");

        let retrieval_methods_entry = entries.iter().find(|(k, _)| *k == Value::Integer(2.into())).expect("device retrieval methods key 2 present");
        let Value::Array(methods) = &retrieval_methods_entry.1 else { panic!("expected an array of connection methods") };
        let Value::Array(method) = &methods[0] else { panic!("expected [type, version, options]") };
        assert_eq!(method.len(), 3);
        assert_eq!(method[0], Value::Integer(CONNECTION_METHOD_TYPE_BLE.into()));
        let Value::Map(options) = &method[2] else { panic!("expected a BLE options map") };
        assert!(find_bool(options, BLE_OPTION_SUPPORT_CENTRAL_CLIENT_MODE).unwrap());
        assert!(!find_bool(options, BLE_OPTION_SUPPORT_PERIPHERAL_SERVER_MODE).unwrap());
        assert_eq!(find_uuid(options, BLE_OPTION_CENTRAL_CLIENT_MODE_UUID).unwrap(), sample_uuid());
    }

    /// §8 concrete scenario 1 (Annex D `DeviceEngagement`, version "1.0", one BLE
    /// central-client-mode retrieval method, `peripheral-server=false`). Reconstructed here
    /// rather than copied — see DESIGN.md for why the literal Annex D fixture bytes aren't
    /// quoted — but exercising the exact shape the scenario names: integer-keyed top map,
    /// `[type, version, options]` connection method, BLE options keyed 0/1/11.
    #[test]
    fn annex_d_style_device_engagement_round_trips() {
        let engagement = DeviceEngagementBuilder::new(VERSION_1_0, fresh_public_key())
            .with_connection_method(ConnectionMethod::BleCentralClientMode { uuid: sample_uuid() })
            .build()
            .unwrap();
        let bytes = cbor::cbor_serialize(&DeviceEngagementBytes::from(engagement.clone())).unwrap();

        let decoded: DeviceEngagementBytes = cbor::cbor_deserialize(&bytes).unwrap();
        assert_eq!(decoded.0 .0.version, VERSION_1_0);
        assert_eq!(
            decoded.0 .0.device_retrieval_methods,
            vec![ConnectionMethod::BleCentralClientMode { uuid: sample_uuid() }]
        );
    }
}
