//! Proc-macro crate for the `register_block!` register map DSL.
//!
//! Generates a typed accessor struct over a `RegisterBus`. The struct borrows
//! the bus and carries a base address; every register access goes through the
//! bus, so the same map drives real hardware and host-side mocks. Registers
//! whose reads clear hardware state get an `unsafe` reader.

mod codegen;
mod parse;

use proc_macro::TokenStream;
use syn::parse_macro_input;

use crate::parse::RegisterBlock;

/// Generates a typed register block struct with bus-backed accessors.
///
/// # Syntax
///
/// ```ignore
/// register_block! {
///     /// Doc comment for the struct.
///     pub StructName {
///         /// Doc comment for the register.
///         [offset; width; access_mode] name => OptionalBitflagsType,
///     }
/// }
/// ```
///
/// - `offset`: byte offset from base (integer literal, e.g. `0x09A`)
/// - `width`: `u8`, `u16`, or `u32`
/// - `access_mode`: `ro` (read-only), `wo` (write-only), `rw` (read-write),
///   `rc` (read clears, plus write)
/// - `name`: register name (generates method names)
/// - `=> Type`: optional bitflags type (must have `from_bits_retain`/`.bits()`)
///
/// # Generated Code
///
/// For each register, generates:
/// - `ro`/`rw`: `fn name(&self) -> Type` (reader)
/// - `rc`: `unsafe fn take_name(&self) -> Type` (destructive reader)
/// - `wo`/`rw`/`rc`: `fn set_name(&self, value: Type)` (writer)
///
/// # Example
///
/// ```ignore
/// use ocs_mmio::register_block;
///
/// register_block! {
///     /// CIA timer and interrupt registers.
///     pub CiaRegs {
///         /// Timer A low byte.
///         [0x400; u8; rw] talo,
///         /// Interrupt control; reading acknowledges every source.
///         [0xD00; u8; rc] icr => Icr,
///     }
/// }
/// ```
#[proc_macro]
pub fn register_block(input: TokenStream) -> TokenStream {
    let block = parse_macro_input!(input as RegisterBlock);
    codegen::generate(&block).into()
}
