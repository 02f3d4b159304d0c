//! Code generation for the `register_block!` macro.
//!
//! Turns the parsed definition into a struct borrowing a
//! `::ocs_mmio::RegisterBus`, with one accessor pair per register.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::parse::{AccessMode, RegWidth, RegisterBlock, RegisterDef};

/// Generates the complete output for a register block definition.
pub fn generate(block: &RegisterBlock) -> TokenStream {
    let vis = &block.vis;
    let name = &block.name;
    let attrs = &block.attrs;

    let methods: Vec<TokenStream> = block.registers.iter().map(generate_methods).collect();

    quote! {
        #(#attrs)*
        #vis struct #name<'a, B: ?Sized> {
            bus: &'a B,
            base: usize,
        }

        impl<B: ?Sized> Clone for #name<'_, B> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<B: ?Sized> Copy for #name<'_, B> {}

        impl<'a, B: ::ocs_mmio::RegisterBus + ?Sized> #name<'a, B> {
            /// Creates an accessor for the block at `base` on `bus`.
            #[must_use]
            #vis const fn new(bus: &'a B, base: usize) -> Self {
                Self { bus, base }
            }

            /// Returns the base address of the block.
            #[must_use]
            #vis const fn base(&self) -> usize {
                self.base
            }

            #(#methods)*
        }
    }
}

fn generate_methods(reg: &RegisterDef) -> TokenStream {
    let mut methods = TokenStream::new();
    if reg.access.readable() {
        methods.extend(generate_read(reg));
    }
    if reg.access == AccessMode::ReadClear {
        methods.extend(generate_take(reg));
    }
    if reg.access.writable() {
        methods.extend(generate_write(reg));
    }
    methods
}

/// Expression reading the raw register value from the bus.
fn raw_read(reg: &RegisterDef) -> TokenStream {
    let offset = &reg.offset;
    let read = format_ident!("read_{}", reg.width.type_name());
    quote! { self.bus.#read(self.base + #offset) }
}

/// Wraps a raw read in the register's bitflags type, if it has one.
fn typed_read(reg: &RegisterDef) -> (TokenStream, TokenStream) {
    let raw = raw_read(reg);
    let width_ty = width_type(reg.width);
    match reg.bitflags_type {
        Some(ref bf_type) => (
            quote! { #bf_type },
            quote! { #bf_type::from_bits_retain(#raw) },
        ),
        None => (width_ty, raw),
    }
}

fn generate_read(reg: &RegisterDef) -> TokenStream {
    let name = &reg.name;
    let attrs = &reg.attrs;
    let (ty, body) = typed_read(reg);

    quote! {
        #(#attrs)*
        #[inline]
        #[must_use]
        pub fn #name(&self) -> #ty {
            #body
        }
    }
}

fn generate_take(reg: &RegisterDef) -> TokenStream {
    let take_name = format_ident!("take_{}", reg.name);
    let attrs = &reg.attrs;
    let (ty, body) = typed_read(reg);

    quote! {
        #(#attrs)*
        ///
        /// # Safety
        ///
        /// Reading this register clears hardware state. The caller must be
        /// the sole consumer of that state for the current pass.
        #[inline]
        pub unsafe fn #take_name(&self) -> #ty {
            #body
        }
    }
}

fn generate_write(reg: &RegisterDef) -> TokenStream {
    let name = &reg.name;
    let setter_name = format_ident!("set_{}", name);
    let offset = &reg.offset;
    let width_ty = width_type(reg.width);
    let write = format_ident!("write_{}", reg.width.type_name());

    let set_doc = format!("Writes the `{name}` register.");

    let (ty, value) = match reg.bitflags_type {
        Some(ref bf_type) => (quote! { #bf_type }, quote! { value.bits() }),
        None => (width_ty, quote! { value }),
    };

    quote! {
        #[doc = #set_doc]
        #[inline]
        pub fn #setter_name(&self, value: #ty) {
            self.bus.#write(self.base + #offset, #value);
        }
    }
}

fn width_type(width: RegWidth) -> TokenStream {
    let ident = format_ident!("{}", width.type_name());
    quote! { #ident }
}
