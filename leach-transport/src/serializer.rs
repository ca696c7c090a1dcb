use serde::Serialize;
use thiserror::Error;

/// Error types for serialization operations
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary serialization error: {0}")]
    Binary(#[from] bincode::Error),
}

/// Base serializer trait without generics for object-safety
pub trait Serializer: Send + Sync {
    fn serialize_to_bytes(&self, data: &dyn SerializeObject) -> Result<Vec<u8>, SerializationError>;
}

/// Trait for objects that can be serialized
pub trait SerializeObject {
    fn to_json(&self) -> Result<Vec<u8>, SerializationError>;
    fn to_binary(&self) -> Result<Vec<u8>, SerializationError>;
}

impl<T: Serialize + ?Sized> SerializeObject for T {
    fn to_json(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(serde_json::to_vec(self)?)
    }

    fn to_binary(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(bincode::serialize(self)?)
    }
}

/// One JSON document per frame.
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize_to_bytes(&self, data: &dyn SerializeObject) -> Result<Vec<u8>, SerializationError> {
        data.to_json()
    }
}

/// bincode frames, optionally base64-armoured so they survive
/// newline-delimited output.
pub struct BinarySerializer {
    armored: bool,
}

impl BinarySerializer {
    pub fn raw() -> Self {
        Self { armored: false }
    }

    pub fn armored() -> Self {
        Self { armored: true }
    }
}

impl Serializer for BinarySerializer {
    fn serialize_to_bytes(&self, data: &dyn SerializeObject) -> Result<Vec<u8>, SerializationError> {
        let bytes = data.to_binary()?;
        if self.armored {
            Ok(base64::encode(bytes).into_bytes())
        } else {
            Ok(bytes)
        }
    }
}

/// Produces nothing; the controller skips empty payloads.
pub struct NullSerializer;

impl Serializer for NullSerializer {
    fn serialize_to_bytes(&self, _data: &dyn SerializeObject) -> Result<Vec<u8>, SerializationError> {
        Ok(Vec::new())
    }
}
