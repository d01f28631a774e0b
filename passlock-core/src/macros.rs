//! Helpers for narrowing CBOR values. Call sites map the generic error to
//! the variant appropriate to their position in the structure.

macro_rules! cbor_try_map {
    ($value:expr) => {
        match $value {
            serde_cbor_2::Value::Map(m) => Ok(m),
            _ => Err($crate::error::WebauthnError::COSEKeyInvalidCBORValue),
        }
    };
}

macro_rules! cbor_try_i128 {
    ($value:expr) => {
        match $value {
            serde_cbor_2::Value::Integer(i) => Ok(*i),
            _ => Err($crate::error::WebauthnError::COSEKeyInvalidCBORValue),
        }
    };
}

macro_rules! cbor_try_bytes {
    ($value:expr) => {
        match $value {
            serde_cbor_2::Value::Bytes(b) => Ok(b),
            _ => Err($crate::error::WebauthnError::COSEKeyInvalidCBORValue),
        }
    };
}

macro_rules! cbor_try_string {
    ($value:expr) => {
        match $value {
            serde_cbor_2::Value::Text(s) => Ok(s.clone()),
            _ => Err($crate::error::WebauthnError::COSEKeyInvalidCBORValue),
        }
    };
}
