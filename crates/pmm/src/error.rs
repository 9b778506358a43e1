//! Error types for the small surface that can actually fail with a
//! recoverable `Result` rather than a fatal invariant panic.
//!
//! Modeled on the corpus's `define_kernel_error!` macro: a small enum with a
//! stable numeric code (useful when the only available sink is a serial
//! console) and a `Display` impl, rather than pulling in `thiserror` — this
//! crate is `no_std` and the corpus reserves `thiserror`/`anyhow` for
//! host-side tooling.

macro_rules! define_pmm_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $code:literal => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            /// Stable numeric code for this error, for logging contexts with
            /// no string table.
            #[must_use]
            pub const fn code(&self) -> u16 {
                match self {
                    $($name::$variant => $code,)*
                }
            }

            /// Short human-readable description.
            #[must_use]
            pub const fn message(&self) -> &'static str {
                match self {
                    $($name::$variant => $desc,)*
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{} (0x{:02x})", self.message(), self.code())
            }
        }
    };
}

define_pmm_error! {
    /// Caller-argument errors raised by `Pool::init`/`Pool::init_empty`.
    ///
    /// These are the one place this crate returns `Result`: initialization
    /// runs once, off the hot path, against boot-time configuration rather
    /// than a trusted internal invariant. Everything past init that would
    /// indicate corrupted allocator state panics instead (see the crate's
    /// top-level docs).
    pub enum PoolInitError {
        /// `nr_pages` was zero; a pool cannot own no frames.
        ZeroPages = 0x01 => "pool initialized with zero pages",
        /// `reserved_pages` exceeded `nr_pages`, leaving nothing to release.
        ReservedExceedsTotal = 0x02 => "reserved_pages exceeds nr_pages",
    }
}
