//! I/O utilities for loading CSV files with padding

use crate::memory::{aligned_free, allocate_padded_buffer};
use std::fs::File;
use std::io::Read;
use std::ptr::NonNull;

/// A buffer containing file data with padding for safe SIMD operations
pub struct PaddedBuffer {
    ptr: NonNull<u8>,
    length: usize,
    padding: usize,
}

impl PaddedBuffer {
    /// Get a slice view of the data (excluding padding)
    #[inline(always)]
    pub fn data(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.length) }
    }

    /// Get the length of the data (excluding padding)
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check if the buffer is empty
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Get raw pointer to the data
    #[inline(always)]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for PaddedBuffer {
    fn drop(&mut self) {
        unsafe {
            aligned_free(self.ptr, self.length, self.padding);
        }
    }
}

/// Load a file into memory with padding for safe SIMD operations
///
/// # Arguments
/// * `filename` - Path to the file to load
/// * `padding` - Number of bytes to pad at the end for safe SIMD reads
///
/// # Returns
/// A `PaddedBuffer` containing the file data with padding
pub fn get_corpus(filename: &str, padding: usize) -> Result<PaddedBuffer, String> {
    let mut file =
        File::open(filename).map_err(|e| format!("Could not open file '{}': {}", filename, e))?;

    let metadata = file
        .metadata()
        .map_err(|e| format!("Could not read file metadata: {}", e))?;

    let length = metadata.len() as usize;

    let ptr = allocate_padded_buffer(length, padding)?;

    // SAFETY: We just allocated this buffer with the correct size
    let slice = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), length) };

    file.read_exact(slice)
        .map_err(|e| format!("Could not read file data: {}", e))?;

    Ok(PaddedBuffer {
        ptr,
        length,
        padding,
    })
}
