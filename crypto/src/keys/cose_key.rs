use ciborium::value::Value;

use crate::curve::DoubleCoordinateCurve;
use crate::curve::OkpCurve;
use crate::error::CryptoError;
use crate::error::Result;
use crate::keys::double_coordinate::DoubleCoordinatePrivateKey;
use crate::keys::double_coordinate::DoubleCoordinatePublicKey;
use crate::keys::okp::OkpPrivateKey;
use crate::keys::okp::OkpPublicKey;

// COSE_Key common parameter labels (RFC 8152 §7.1).
const KTY: i128 = 1;
const CRV: i128 = -1;
const X: i128 = -2;
const Y: i128 = -3;
const D: i128 = -4;

// COSE_Key `kty` values (RFC 8152 §13).
const KTY_EC2: i128 = 2;
const KTY_OKP: i128 = 1;

fn get<'a>(map: &'a [(Value, Value)], key: i128) -> Option<&'a Value> {
    map.iter()
        .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key))
        .map(|(_, v)| v)
}

fn bytes_of(value: &Value, field: &str) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b.clone()),
        _ => Err(CryptoError::InvalidEncoding(format!("COSE_Key field `{field}` is not a bstr"))),
    }
}

fn int_of(value: &Value, field: &str) -> Result<i128> {
    match value {
        Value::Integer(i) => Ok((*i).into()),
        _ => Err(CryptoError::InvalidEncoding(format!("COSE_Key field `{field}` is not an int"))),
    }
}

impl DoubleCoordinatePublicKey {
    pub fn to_cose_key(&self) -> Value {
        Value::Map(vec![
            (Value::Integer(KTY.into()), Value::Integer(KTY_EC2.into())),
            (Value::Integer(CRV.into()), Value::Integer((self.curve.cose_crv() as i128).into())),
            (Value::Integer(X.into()), Value::Bytes(self.x.clone())),
            (Value::Integer(Y.into()), Value::Bytes(self.y.clone())),
        ])
    }

    pub fn from_cose_key(value: &Value) -> Result<Self> {
        let map = as_map(value)?;
        let kty = int_of(get(map, KTY).ok_or_else(|| missing("kty"))?, "kty")?;
        if kty != KTY_EC2 {
            return Err(CryptoError::InvalidEncoding(format!("expected COSE kty=EC2(2), got {kty}")));
        }
        let crv = int_of(get(map, CRV).ok_or_else(|| missing("crv"))?, "crv")?;
        let curve = DoubleCoordinateCurve::from_cose_crv(crv as i64)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(format!("unknown COSE crv {crv}")))?;
        let x = bytes_of(get(map, X).ok_or_else(|| missing("x"))?, "x")?;
        let y = bytes_of(get(map, Y).ok_or_else(|| missing("y"))?, "y")?;
        Ok(Self { curve, x, y })
    }
}

impl DoubleCoordinatePrivateKey {
    pub fn to_cose_key(&self) -> Value {
        let mut pairs = match self.public_key().to_cose_key() {
            Value::Map(pairs) => pairs,
            _ => unreachable!(),
        };
        pairs.push((Value::Integer(D.into()), Value::Bytes(self.d.clone())));
        Value::Map(pairs)
    }

    pub fn from_cose_key(value: &Value) -> Result<Self> {
        let public = DoubleCoordinatePublicKey::from_cose_key(value)?;
        let map = as_map(value)?;
        let d = bytes_of(get(map, D).ok_or_else(|| missing("d"))?, "d")?;
        Ok(Self {
            curve: public.curve,
            x: public.x,
            y: public.y,
            d,
        })
    }
}

impl OkpPublicKey {
    pub fn to_cose_key(&self) -> Value {
        Value::Map(vec![
            (Value::Integer(KTY.into()), Value::Integer(KTY_OKP.into())),
            (Value::Integer(CRV.into()), Value::Integer((self.curve.cose_crv() as i128).into())),
            (Value::Integer(X.into()), Value::Bytes(self.x.clone())),
        ])
    }

    pub fn from_cose_key(value: &Value) -> Result<Self> {
        let map = as_map(value)?;
        let kty = int_of(get(map, KTY).ok_or_else(|| missing("kty"))?, "kty")?;
        if kty != KTY_OKP {
            return Err(CryptoError::InvalidEncoding(format!("expected COSE kty=OKP(1), got {kty}")));
        }
        let crv = int_of(get(map, CRV).ok_or_else(|| missing("crv"))?, "crv")?;
        let curve =
            OkpCurve::from_cose_crv(crv as i64).ok_or_else(|| CryptoError::UnsupportedAlgorithm(format!("unknown COSE crv {crv}")))?;
        let x = bytes_of(get(map, X).ok_or_else(|| missing("x"))?, "x")?;
        Ok(Self { curve, x })
    }
}

impl OkpPrivateKey {
    pub fn to_cose_key(&self) -> Value {
        let mut pairs = match self.public_key().to_cose_key() {
            Value::Map(pairs) => pairs,
            _ => unreachable!(),
        };
        pairs.push((Value::Integer(D.into()), Value::Bytes(self.d.clone())));
        Value::Map(pairs)
    }

    pub fn from_cose_key(value: &Value) -> Result<Self> {
        let public = OkpPublicKey::from_cose_key(value)?;
        let map = as_map(value)?;
        let d = bytes_of(get(map, D).ok_or_else(|| missing("d"))?, "d")?;
        Ok(Self {
            curve: public.curve,
            x: public.x,
            d,
        })
    }
}

fn as_map(value: &Value) -> Result<&[(Value, Value)]> {
    match value {
        Value::Map(pairs) => Ok(pairs),
        _ => Err(CryptoError::InvalidEncoding("COSE_Key is not a CBOR map".to_owned())),
    }
}

fn missing(field: &str) -> CryptoError {
    CryptoError::InvalidEncoding(format!("COSE_Key is missing required field `{field}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::EcPrivateKey;

    #[test]
    fn ec2_cose_key_round_trips() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let EcPrivateKey::DoubleCoordinate(d) = &key else {
            unreachable!()
        };
        let cbor = d.to_cose_key();
        let back = DoubleCoordinatePrivateKey::from_cose_key(&cbor).unwrap();
        assert_eq!(d.x, back.x);
        assert_eq!(d.y, back.y);
        assert_eq!(d.d, back.d);
    }
}
