/// Defines a trait for encoding data structures to bytes.
/// Implementors of this trait can convert themselves into a byte representation.
pub trait TopologyEncode {
    /// Encodes the implementing type to a vector of bytes.
    ///
    /// # Returns
    /// A vector of bytes representing the encoded data structure.
    fn encode_topology(&self) -> Vec<u8>;
}

/// Defines a trait for decoding data structures from bytes.
/// This trait enables reconstruction of objects from their byte representation.
pub trait TopologyDecode: Sized {
    /// Creates an instance of the implementing type from a byte slice.
    ///
    /// # Parameters
    /// * `bytes` - The byte slice containing the encoded data.
    ///
    /// # Returns
    /// `Some(Self)` if decoding was successful, `None` otherwise.
    fn from_bytes_topology(bytes: &[u8]) -> Option<Self>;
}

/// Defines a generic trait for fixed-width values that can be encoded to and decoded from bytes.
pub trait ByteEncodable: Sized {
    /// Converts the implementing type to a vector of bytes.
    fn to_bytes(&self) -> Vec<u8>;

    /// Creates an instance of the implementing type from a byte slice.
    ///
    /// # Returns
    /// `Some(Self)` if the slice holds at least `byte_size()` bytes, `None` otherwise.
    fn from_bytes(bytes: &[u8]) -> Option<Self>;

    /// Returns the number of bytes required to encode this type.
    fn byte_size() -> usize;
}

/// Little-endian encoding of u32, used for type ids.
impl ByteEncodable for u32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 4] = bytes.get(0..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(array))
    }

    fn byte_size() -> usize {
        4
    }
}

/// Little-endian encoding of u64, used for node ids and offsets.
impl ByteEncodable for u64 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 8] = bytes.get(0..8)?.try_into().ok()?;
        Some(u64::from_le_bytes(array))
    }

    fn byte_size() -> usize {
        8
    }
}

/// A flat array encodes as the concatenation of its elements, without a length prefix.
/// The enclosing container is responsible for recording the element count.
impl<T> TopologyEncode for Vec<T>
where
    T: ByteEncodable,
{
    fn encode_topology(&self) -> Vec<u8> {
        let mut encoded_bytes = Vec::with_capacity(self.len() * T::byte_size());
        for value in self {
            encoded_bytes.extend_from_slice(&value.to_bytes());
        }
        encoded_bytes
    }
}

/// Decodes a flat array; fails when the byte count is not a multiple of the element width.
impl<T> TopologyDecode for Vec<T>
where
    T: ByteEncodable,
{
    fn from_bytes_topology(bytes: &[u8]) -> Option<Self> {
        let width = T::byte_size();
        if bytes.len() % width != 0 {
            // Partial element at the tail
            return None;
        }
        bytes.chunks_exact(width).map(T::from_bytes).collect()
    }
}
