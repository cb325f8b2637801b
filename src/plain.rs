use std::mem::size_of;

/// Types that can be viewed as their raw bytes for upload to the gpu.
///
/// # Safety
/// Implementors must be `#[repr(C)]` (or primitive) with no padding and no pointers.
pub unsafe trait Plain: Sized {
    fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self as *const Self as *const u8, size_of::<Self>()) }
    }
}

unsafe impl Plain for f32 {}

unsafe impl Plain for u8 {}

unsafe impl<T: Plain, const N: usize> Plain for [T; N] {}
