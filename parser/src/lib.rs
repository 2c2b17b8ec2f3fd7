extern crate proc_macro;

use proc_macro2::{Span, TokenStream};
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;
use syn::{
    parse_macro_input,
    Data,
    DeriveInput,
    Error,
    GenericArgument,
    Ident,
    PathArguments,
    Result,
    Type,
};

mod gen;
mod parse;

/// Derives `common::messages::MessageComponent`.
///
/// Structs are read field by field in declaration order, big-endian. `Vec<u8>` and `String`
/// fields need a length: `#[parse(greedy)]` takes the rest of the object body,
/// `#[parse(fixed_len(N))]` a constant and `#[parse(len = "expr")]` an expression over earlier
/// fields.
///
/// Fieldless enums need `#[repr(u8)]`, `#[repr(u16)]` or `#[repr(u32)]`. Unknown wire values are
/// an `InvalidEnumValue` error unless one variant is marked `#[parse(fallback)]`, in which case
/// they decode to that variant.
#[proc_macro_derive(MessageComponent, attributes(parse))]
pub fn derive_message_component(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let crate_common = common();

    match &input.data {
        Data::Struct(data_struct) => {
            let fields = match parse::parse_fields(data_struct) {
                Ok(fields) => fields,
                Err(e) => return e.into_compile_error().into(),
            };
            gen::gen_struct_impl(&crate_common, &input, &fields).into()
        }
        Data::Enum(data_enum) => {
            let repr = match parse::parse_repr(&input) {
                Ok(repr) => repr,
                Err(e) => return e.into_compile_error().into(),
            };
            let variants = match parse::parse_variants(data_enum) {
                Ok(variants) => variants,
                Err(e) => return e.into_compile_error().into(),
            };
            gen::gen_enum_impl(&crate_common, &input, repr, &variants).into()
        }
        _ => Error::new_spanned(&input, "ADT not supported")
            .into_compile_error()
            .into(),
    }
}

pub(crate) fn matches_ident(ty: &Type, ident: &str) -> bool {
    match ty {
        Type::Path(path) =>
            path.qself.is_none()
                && path.path.leading_colon.is_none()
                && path
                    .path
                    .segments
                    .last()
                    .map(|segment| segment.ident == ident)
                    .unwrap_or(false),
        _ => false,
    }
}

pub(crate) fn extract_type_from_container(ty: &Type) -> Result<Type> {
    let path = match ty {
        Type::Path(path) => path,
        ty => return Err(Error::new_spanned(ty, "Expected path type")),
    };

    let type_params = match path.path.segments.last() {
        Some(segment) => &segment.arguments,
        None => return Err(Error::new_spanned(ty, "Expected path type")),
    };

    let generic_arg = match type_params {
        PathArguments::AngleBracketed(params) => params.args.first(),
        _ => None,
    };

    match generic_arg {
        Some(GenericArgument::Type(ty)) => Ok(ty.clone()),
        _ => Err(Error::new_spanned(ty, "Expected type parameter")),
    }
}

pub(crate) fn common() -> TokenStream {
    match crate_name("common") {
        Ok(FoundCrate::Itself) => quote! { crate },
        Ok(FoundCrate::Name(name)) => {
            let name = Ident::new(&name, Span::call_site());
            quote! { ::#name }
        }
        Err(e) => Error::new(Span::call_site(), format!("{:?}", e)).to_compile_error(),
    }
}
