//! Deterministic construction of result-cache keys. Every appended field
//! is framed with a marker byte and a little-endian length so that
//! adjacent fields can never be confused.

pub trait Cacheable {
    fn cache_key(&self) -> Vec<u8>;
}

const BYTE_MARKER: u8 = 0x0;
const STRING_MARKER: u8 = 0x1;
const BYTES_MARKER: u8 = 0x2;
const COLLECTION_MARKER: u8 = 0x3;
const CACHEABLE_MARKER: u8 = 0x4;

pub struct CacheKeyBuilder {
    key: Vec<u8>,
}

impl CacheKeyBuilder {
    pub fn new(id: u8) -> Self {
        Self { key: vec![id] }
    }

    pub fn append_byte(mut self, value: u8) -> Self {
        self.key.push(BYTE_MARKER);
        self.key.push(value);
        self
    }

    pub fn append_string(mut self, value: &str) -> Self {
        self.key.push(STRING_MARKER);
        self.push_len(value.len());
        self.key.extend_from_slice(value.as_bytes());
        self
    }

    pub fn append_bytes(mut self, value: &[u8]) -> Self {
        self.key.push(BYTES_MARKER);
        self.push_len(value.len());
        self.key.extend_from_slice(value);
        self
    }

    // The caller is responsible for iterating in a deterministic order.
    pub fn append_strings<'a>(mut self, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut count: usize = 0;
        let mut body = Vec::new();
        for value in values {
            body.extend_from_slice(&(value.len() as u32).to_le_bytes());
            body.extend_from_slice(value.as_bytes());
            count += 1;
        }

        self.key.push(COLLECTION_MARKER);
        self.push_len(count);
        self.key.extend_from_slice(&body);
        self
    }

    pub fn append_cacheable(mut self, value: &dyn Cacheable) -> Self {
        let sub_key = value.cache_key();
        self.key.push(CACHEABLE_MARKER);
        self.push_len(sub_key.len());
        self.key.extend_from_slice(&sub_key);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.key
    }

    fn push_len(&mut self, len: usize) {
        self.key.extend_from_slice(&(len as u32).to_le_bytes());
    }
}
