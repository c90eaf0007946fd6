// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boilerplate macros shared by the pipeline crates.
//!
//! [`simple_display!`] names fieldless enum variants, [`setters!`] emits
//! chained setters, and [`builder!`] assembles a test-only builder from them.

/// Name each unit variant of an enum: emits `as_str()` and `Display`.
///
/// ```ignore
/// crate::simple_display! {
///     JobStatus {
///         Queued => "queued",
///         Running => "running",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($enum:ty { $( $variant:ident => $name:expr ),+ $(,)? }) => {
        impl $enum {
            /// Wire/display name of this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                }
            }
        }

        impl std::fmt::Display for $enum {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Chained `fn field(mut self, v) -> Self` setters for an existing impl block.
///
/// `into` fields accept `impl Into<T>`, `set` fields take `T` as is, and
/// `option` fields are stored as `Some(v.into())`.
///
/// ```ignore
/// impl PipelineCommand {
///     pj_core::setters! {
///         set { args: Vec<String> }
///         option { cwd: PathBuf }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into { $( $conv:ident : $conv_ty:ty ),* $(,)? })?
        $(set { $( $plain:ident : $plain_ty:ty ),* $(,)? })?
        $(option { $( $maybe:ident : $maybe_ty:ty ),* $(,)? })?
    ) => {
        $($(
            pub fn $conv(mut self, v: impl Into<$conv_ty>) -> Self {
                self.$conv = v.into();
                self
            }
        )*)?
        $($(
            pub fn $plain(mut self, v: $plain_ty) -> Self {
                self.$plain = v;
                self
            }
        )*)?
        $($(
            pub fn $maybe(mut self, v: impl Into<$maybe_ty>) -> Self {
                self.$maybe = Some(v.into());
                self
            }
        )*)?
    };
}

/// Test builder for a plain struct whose fields are all listed.
///
/// Emits the builder type, its `Default` (from the listed defaults), the
/// setters, `build()`, and `Target::builder()`. Everything is compiled only
/// under `test` or the `test-support` feature. Field groups follow
/// [`setters!`]; `option` defaults are written as full `Option` values.
///
/// ```ignore
/// crate::builder! {
///     pub struct JobBuilder => Job {
///         into { name: String = "retention" }
///         set { created_at_ms: u64 = 1_000_000 }
///         option { error: JobError = None }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $builder:ident => $target:ident {
            $(into { $( $conv:ident : $conv_ty:ty = $conv_default:expr ),* $(,)? })?
            $(set { $( $plain:ident : $plain_ty:ty = $plain_default:expr ),* $(,)? })?
            $(option { $( $maybe:ident : $maybe_ty:ty = $maybe_default:expr ),* $(,)? })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $builder {
            $($( $conv: $conv_ty, )*)?
            $($( $plain: $plain_ty, )*)?
            $($( $maybe: Option<$maybe_ty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $builder {
            fn default() -> Self {
                $builder {
                    $($( $conv: $conv_default.into(), )*)?
                    $($( $plain: $plain_default, )*)?
                    $($( $maybe: $maybe_default, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $builder {
            $crate::setters! {
                $(into { $( $conv: $conv_ty ),* })?
                $(set { $( $plain: $plain_ty ),* })?
                $(option { $( $maybe: $maybe_ty ),* })?
            }

            pub fn build(self) -> $target {
                let $builder { $($( $conv, )*)? $($( $plain, )*)? $($( $maybe, )*)? } = self;
                $target { $($( $conv, )*)? $($( $plain, )*)? $($( $maybe, )*)? }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $target {
            pub fn builder() -> $builder {
                $builder::default()
            }
        }
    };
}
