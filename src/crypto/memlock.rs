// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Memory locking for sensitive byte buffers.
//!
//! Prevents secret material from being swapped to disk by pinning pages with
//! platform APIs (mlock on Unix). Locking is best-effort: insufficient
//! privileges or limits downgrade to an unlocked allocation rather than
//! failing the caller. Buffers are zeroed before release either way.
//!
//! # Security Considerations
//!
//! - Locked memory is still visible to root/kernel
//! - Core dumps may still contain locked memory unless disabled
//! - Memory limits may apply (see ulimit -l on Linux)

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use tracing::debug;
use zeroize::Zeroize;

/// Attempts to lock a memory region to prevent swapping.
///
/// # Safety
/// The caller must ensure ptr is valid and len bytes are accessible.
#[cfg(unix)]
unsafe fn mlock_impl(ptr: *const u8, len: usize) -> bool {
    libc::mlock(ptr as *const libc::c_void, len) == 0
}

#[cfg(not(unix))]
unsafe fn mlock_impl(_ptr: *const u8, _len: usize) -> bool {
    false
}

/// Attempts to unlock a previously locked region.
///
/// # Safety
/// The caller must ensure ptr is valid and len bytes were previously locked.
#[cfg(unix)]
unsafe fn munlock_impl(ptr: *const u8, len: usize) {
    let _ = libc::munlock(ptr as *const libc::c_void, len);
}

#[cfg(not(unix))]
unsafe fn munlock_impl(_ptr: *const u8, _len: usize) {}

/// A pinned buffer of sensitive bytes.
///
/// The allocation is zero-initialized, locked against swapping where the
/// platform allows it, and zeroized before it is unlocked and freed on drop.
pub(crate) struct LockedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
    locked: bool,
}

impl LockedBuffer {
    /// Allocates a locked, zero-initialized buffer of `len` bytes.
    ///
    /// `len` must be non-zero; zero-length secrets are represented without an
    /// allocation by the caller.
    pub(crate) fn new(len: usize) -> Option<Self> {
        debug_assert!(len > 0);
        let layout = Layout::from_size_align(len, 8).ok()?;

        let ptr = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr)?;

        let locked = unsafe { mlock_impl(ptr.as_ptr(), len) };
        if !locked {
            debug!("memory locking unavailable, continuing without lock");
        }

        Some(Self {
            ptr,
            len,
            layout,
            locked,
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_locked(&self) -> bool {
        self.locked
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        unsafe {
            let slice = std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len);
            slice.zeroize();

            if self.locked {
                munlock_impl(self.ptr.as_ptr(), self.len);
            }

            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

// LockedBuffer owns its memory exclusively.
unsafe impl Send for LockedBuffer {}
unsafe impl Sync for LockedBuffer {}
