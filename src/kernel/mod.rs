//! Kernel capability consumed by the dispatcher.
//!
//! A kernel is invoked once per coordinate with its own input element, its own output element and
//! the launch's user bytes. It must not depend on any other element; invocations for different
//! coordinates may run concurrently and in any order.

use crate::foundation::core::Coord;

/// Bit set describing which arguments a compiled kernel actually reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelSignature(u32);

impl KernelSignature {
    /// Signature unknown; nothing is checked.
    pub const ANY: Self = Self(0);
    /// Reads its input element.
    pub const IN: Self = Self(0x01);
    /// Writes its output element.
    pub const OUT: Self = Self(0x02);
    /// Reads the user parameter bytes.
    pub const USER_DATA: Self = Self(0x04);
    /// Reads the X coordinate.
    pub const X: Self = Self(0x08);
    /// Reads the Y coordinate.
    pub const Y: Self = Self(0x10);

    /// Raw metadata bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw metadata bits; unknown bits are kept.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// `true` when every bit of `other` is set.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` for [`KernelSignature::ANY`].
    pub fn is_any(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for KernelSignature {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Default for KernelSignature {
    fn default() -> Self {
        Self::ANY
    }
}

/// Module metadata for a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelInfo {
    /// Kernel may run on several workers at once.
    pub threadable: bool,
    /// Declared argument usage.
    pub signature: KernelSignature,
}

impl Default for KernelInfo {
    fn default() -> Self {
        Self {
            threadable: true,
            signature: KernelSignature::ANY,
        }
    }
}

/// Arguments of one kernel invocation.
#[derive(Debug)]
pub struct ElementArgs<'a> {
    /// Input element bytes, when an input buffer is bound.
    pub input: Option<&'a [u8]>,
    /// Output element bytes, when an output buffer is bound.
    pub output: Option<&'a mut [u8]>,
    /// Launch user bytes, forwarded verbatim.
    pub user: &'a [u8],
    /// Coordinate being processed.
    pub coord: Coord,
}

/// Element-wise compute kernel.
pub trait Kernel: Sync {
    /// Module metadata; threadable with an unknown signature unless overridden.
    fn info(&self) -> KernelInfo {
        KernelInfo::default()
    }

    /// Process one coordinate.
    fn invoke(&self, args: ElementArgs<'_>);
}

impl<K: Kernel + ?Sized> Kernel for &K {
    fn info(&self) -> KernelInfo {
        (**self).info()
    }

    fn invoke(&self, args: ElementArgs<'_>) {
        (**self).invoke(args)
    }
}

impl<K: Kernel + ?Sized> Kernel for Box<K> {
    fn info(&self) -> KernelInfo {
        (**self).info()
    }

    fn invoke(&self, args: ElementArgs<'_>) {
        (**self).invoke(args)
    }
}

/// Closure-backed kernel, see [`kernel_fn`].
#[derive(Clone)]
pub struct FnKernel<F> {
    f: F,
    info: KernelInfo,
}

impl<F> FnKernel<F> {
    /// Mark the kernel as unsafe to run on several workers.
    pub fn serial(mut self) -> Self {
        self.info.threadable = false;
        self
    }

    /// Declare which arguments the kernel reads.
    pub fn with_signature(mut self, signature: KernelSignature) -> Self {
        self.info.signature = signature;
        self
    }
}

impl<F> std::fmt::Debug for FnKernel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnKernel").field("info", &self.info).finish()
    }
}

impl<F> Kernel for FnKernel<F>
where
    F: Fn(ElementArgs<'_>) + Sync,
{
    fn info(&self) -> KernelInfo {
        self.info
    }

    fn invoke(&self, args: ElementArgs<'_>) {
        (self.f)(args)
    }
}

/// Wrap a closure as a threadable kernel.
pub fn kernel_fn<F>(f: F) -> FnKernel<F>
where
    F: Fn(ElementArgs<'_>) + Sync,
{
    FnKernel {
        f,
        info: KernelInfo::default(),
    }
}

/// Kernel with its metadata replaced; used when module-level flags override a kernel's own.
pub(crate) struct WithInfo<'k, K: ?Sized> {
    pub(crate) kernel: &'k K,
    pub(crate) info: KernelInfo,
}

impl<K: Kernel + ?Sized> Kernel for WithInfo<'_, K> {
    fn info(&self) -> KernelInfo {
        self.info
    }

    fn invoke(&self, args: ElementArgs<'_>) {
        self.kernel.invoke(args)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/mod.rs"]
mod tests;
