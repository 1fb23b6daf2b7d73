use memmap2::Mmap;
use std::ops::Deref;
use std::sync::Arc;

/// Read-only byte buffer handed out by a [`crate::storage::Directory`].
/// Either heap-owned or a shared file mapping; cheap to clone.
#[derive(Clone)]
pub enum OwnedBytes {
    Ram(Arc<Vec<u8>>),
    Mapped(Arc<Mmap>),
}

impl OwnedBytes {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        OwnedBytes::Ram(Arc::new(bytes))
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            OwnedBytes::Ram(bytes) => bytes.as_slice(),
            OwnedBytes::Mapped(map) => map.deref(),
        }
    }
}

impl Deref for OwnedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for OwnedBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OwnedBytes({} bytes)", self.len())
    }
}
