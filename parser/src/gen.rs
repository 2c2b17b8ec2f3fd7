use crate::parse::{ArrayLength, ArrayType, Field, Repr, TypeInfo, Variant};
use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

pub fn gen_enum_impl(
    crate_common: &TokenStream,
    input: &DeriveInput,
    repr: Repr,
    variants: &[Variant],
) -> TokenStream {
    let name = &input.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let int_ty = repr.int_type();
    let read_int = repr.gen_read();
    let write_int = repr.gen_write(&quote! { __value });

    let read_arms = variants.iter().map(|variant| {
        let ident = &variant.ident;
        quote! {
            __value if __value == Self::#ident as #int_ty => Self::#ident
        }
    });

    let fallback_arm = match variants.iter().find(|variant| variant.fallback) {
        Some(variant) => {
            let ident = &variant.ident;
            quote! { _ => Self::#ident }
        }
        None => quote! {
            __value => return Err(#crate_common::messages::Error::InvalidEnumValue {
                name: #name_str,
                value: u32::from(__value),
            })
        },
    };

    let write_arms = variants.iter().map(|variant| {
        let ident = &variant.ident;
        quote! { Self::#ident => Self::#ident as #int_ty }
    });

    quote! {
        impl #impl_generics #crate_common::messages::MessageComponent for #name #ty_generics #where_clause {
            fn read(__cursor: &mut ::std::io::Cursor<&[u8]>) -> Result<Self, #crate_common::messages::Error> {
                let __value: #int_ty = #read_int;
                Ok(match __value {
                    #( #read_arms, )*
                    #fallback_arm
                })
            }

            fn write(&self, __cursor: &mut ::std::io::Cursor<::std::vec::Vec<u8>>) -> Result<(), #crate_common::messages::Error> {
                let __value: #int_ty = match self {
                    #( #write_arms ),*
                };
                #write_int
                Ok(())
            }
        }
    }
}

pub fn gen_struct_impl(
    crate_common: &TokenStream,
    input: &DeriveInput,
    fields: &[Field],
) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let read = gen_struct_deserialize_impl(crate_common, fields);
    let write = gen_struct_serialize_impl(crate_common, fields);

    quote! {
        impl #impl_generics #crate_common::messages::MessageComponent for #name #ty_generics #where_clause {
            fn read(__cursor: &mut ::std::io::Cursor<&[u8]>) -> Result<Self, #crate_common::messages::Error> {
                #read
            }

            fn write(&self, __cursor: &mut ::std::io::Cursor<::std::vec::Vec<u8>>) -> Result<(), #crate_common::messages::Error> {
                #write
            }
        }
    }
}

fn gen_struct_serialize_impl(crate_common: &TokenStream, fields: &[Field]) -> TokenStream {
    let serialize_fields = fields
        .iter()
        .map(|field| gen_serialize_struct_field(crate_common, field));

    quote! {
        #( #serialize_fields )*
        Ok(())
    }
}

fn gen_struct_deserialize_impl(crate_common: &TokenStream, fields: &[Field]) -> TokenStream {
    let deserialize_fields = fields
        .iter()
        .map(|field| gen_deserialize_struct_field(crate_common, field));
    let field_names = fields.iter().map(|field| &field.ident);

    quote! {
        #( #deserialize_fields )*
        Ok(Self {
            #( #field_names ),*
        })
    }
}

fn gen_serialize_struct_field(crate_common: &TokenStream, field: &Field) -> TokenStream {
    let name = &field.ident;

    match &field.type_info {
        TypeInfo::Array { inner, .. } => inner.gen_write_impl(crate_common, &quote! { self.#name }),
        TypeInfo::Regular(_) => quote! {
            #crate_common::messages::MessageComponent::write(&self.#name, __cursor)?;
        },
    }
}

fn gen_deserialize_struct_field(crate_common: &TokenStream, field: &Field) -> TokenStream {
    let name = &field.ident;

    match &field.type_info {
        TypeInfo::Array {
            length,
            outer,
            inner,
        } => {
            let len = length.gen_read_length();
            let read = inner.gen_read_impl(crate_common);

            quote! {
                let #name: #outer = {
                    #len
                    #read
                    __dest
                };
            }
        }
        TypeInfo::Regular(ty) => quote! {
            let #name: #ty = <#ty as #crate_common::messages::MessageComponent>::read(__cursor)?;
        },
    }
}

impl ArrayLength {
    fn gen_read_length(&self) -> TokenStream {
        match self {
            Self::Expr(expr) => quote! { let __len = usize::from(#expr); },
            Self::Greedy(_) => quote! {
                let __len = __cursor
                    .get_ref()
                    .len()
                    .saturating_sub(usize::try_from(__cursor.position())?);
            },
            Self::Fixed(len) => quote! { let __len: usize = #len; },
        }
    }
}

impl ArrayType {
    fn gen_write_impl(&self, crate_common: &TokenStream, field_ref: &TokenStream) -> TokenStream {
        match self {
            Self::Vec(_) => quote! {
                for __ele in #field_ref.iter() {
                    #crate_common::messages::MessageComponent::write(__ele, __cursor)?;
                }
            },
            Self::Vecu8 => quote! {
                ::std::io::Write::write_all(__cursor, #field_ref.as_slice())?;
            },
            Self::String => quote! {
                ::std::io::Write::write_all(__cursor, #field_ref.as_bytes())?;
            },
        }
    }

    fn gen_read_impl(&self, crate_common: &TokenStream) -> TokenStream {
        match self {
            Self::Vec(ty) => quote! {
                let mut __dest = ::std::vec::Vec::with_capacity(__len);
                for _ in 0 .. __len {
                    __dest.push(<#ty as #crate_common::messages::MessageComponent>::read(__cursor)?);
                }
            },
            Self::Vecu8 => quote! {
                let mut __dest = ::std::vec![0u8; __len];
                ::std::io::Read::read_exact(__cursor, &mut __dest)?;
            },
            Self::String => quote! {
                let mut __dest = ::std::vec![0u8; __len];
                ::std::io::Read::read_exact(__cursor, &mut __dest)?;
                let __dest = ::std::string::String::from_utf8(__dest)?;
            },
        }
    }
}

impl Repr {
    fn int_type(self) -> TokenStream {
        match self {
            Self::U8 => quote! { u8 },
            Self::U16 => quote! { u16 },
            Self::U32 => quote! { u32 },
        }
    }

    fn gen_read(self) -> TokenStream {
        match self {
            Self::U8 => quote! {
                ::byteorder::ReadBytesExt::read_u8(__cursor)?
            },
            Self::U16 => quote! {
                ::byteorder::ReadBytesExt::read_u16::<::byteorder::BigEndian>(__cursor)?
            },
            Self::U32 => quote! {
                ::byteorder::ReadBytesExt::read_u32::<::byteorder::BigEndian>(__cursor)?
            },
        }
    }

    fn gen_write(self, expr: &TokenStream) -> TokenStream {
        match self {
            Self::U8 => quote! {
                ::byteorder::WriteBytesExt::write_u8(__cursor, #expr)?;
            },
            Self::U16 => quote! {
                ::byteorder::WriteBytesExt::write_u16::<::byteorder::BigEndian>(__cursor, #expr)?;
            },
            Self::U32 => quote! {
                ::byteorder::WriteBytesExt::write_u32::<::byteorder::BigEndian>(__cursor, #expr)?;
            },
        }
    }
}
