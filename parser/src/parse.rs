use proc_macro2::TokenStream;
use quote::ToTokens;
use syn::{
    parenthesized,
    parse::{Parse, ParseStream},
    parse2,
    Attribute,
    DataEnum,
    DataStruct,
    DeriveInput,
    Error,
    Expr,
    Fields,
    Ident,
    LitInt,
    LitStr,
    Result,
    Token,
    Type,
};

use crate::{extract_type_from_container, matches_ident};

pub fn parse_fields(data: &DataStruct) -> Result<Vec<Field>> {
    let fields = match &data.fields {
        Fields::Named(named) => named,
        Fields::Unit => return Ok(Vec::new()),
        _ => return Err(Error::new_spanned(&data.fields, "Fields must be named")),
    };

    let mut dest = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let attr = find_parse_attr(&field.attrs);
        let params = parse_params(attr)?;

        if params.fallback {
            return Err(Error::new_spanned(attr, "fallback only applies to enum variants"));
        }

        let outer_ty = Box::new(field.ty.clone());
        let type_info = if matches_ident(&outer_ty, "Vec") {
            let inner_ty = Box::new(extract_type_from_container(&outer_ty)?);
            let is_vec_u8 = matches_ident(&inner_ty, "u8");

            let length = match params.len {
                Some(len) => len,
                None => return Err(Error::new_spanned(field, "missing length parameter")),
            };

            if matches!(&length, ArrayLength::Greedy(_)) && !is_vec_u8 {
                return Err(Error::new_spanned(
                    field,
                    "Greedy arrays must be byte arrays",
                ));
            }

            TypeInfo::Array {
                length,
                outer: outer_ty,
                inner: if is_vec_u8 {
                    ArrayType::Vecu8
                } else {
                    ArrayType::Vec(inner_ty)
                },
            }
        } else if matches_ident(&outer_ty, "String") {
            let length = match params.len {
                Some(len) => len,
                None => return Err(Error::new_spanned(field, "missing length parameter")),
            };

            TypeInfo::Array {
                length,
                outer: outer_ty,
                inner: ArrayType::String,
            }
        } else if params.len.is_some() {
            return Err(Error::new_spanned(
                attr,
                "lengths can only be applied to array types",
            ));
        } else {
            TypeInfo::Regular(outer_ty)
        };

        // Checked above: named fields always carry an identifier
        let ident = match &field.ident {
            Some(ident) => ident.clone(),
            None => return Err(Error::new_spanned(field, "Fields must be named")),
        };

        dest.push(Field { ident, type_info })
    }

    Ok(dest)
}

pub fn parse_repr(input: &DeriveInput) -> Result<Repr> {
    let attr = match input.attrs.iter().find(|&attr| attr.path.is_ident("repr")) {
        Some(attr) => attr,
        None =>
            return Err(Error::new_spanned(
                &input.ident,
                "enums must declare #[repr(u8)], #[repr(u16)] or #[repr(u32)]",
            )),
    };

    let ident: Ident = attr.parse_args()?;
    match ident.to_string().as_str() {
        "u8" => Ok(Repr::U8),
        "u16" => Ok(Repr::U16),
        "u32" => Ok(Repr::U32),
        _ => Err(Error::new_spanned(ident, "unsupported repr")),
    }
}

pub fn parse_variants(data: &DataEnum) -> Result<Vec<Variant>> {
    let mut dest = Vec::with_capacity(data.variants.len());
    let mut has_fallback = false;

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new_spanned(
                &variant.fields,
                "Variants must not contain fields",
            ));
        }

        let attr = find_parse_attr(&variant.attrs);
        let params = parse_params(attr)?;
        if params.len.is_some() {
            return Err(Error::new_spanned(
                attr,
                "lengths can only be applied to array types",
            ));
        }

        if params.fallback {
            if has_fallback {
                return Err(Error::new_spanned(variant, "Duplicate fallback variant"));
            }
            has_fallback = true;
        }

        dest.push(Variant {
            ident: variant.ident.clone(),
            fallback: params.fallback,
        });
    }

    Ok(dest)
}

fn find_parse_attr(attrs: &[Attribute]) -> Option<&Attribute> {
    attrs.iter().find(|&attr| attr.path.is_ident("parse"))
}

fn parse_params(attr: Option<&Attribute>) -> Result<ParseParams> {
    Ok(attr
        .map(|attr| parse2::<ParseParams>(attr.tokens.clone()))
        .transpose()?
        .unwrap_or_default())
}

#[derive(Default)]
struct ParseParams {
    len: Option<ArrayLength>,
    fallback: bool,
}

impl Parse for ParseParams {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let mut params = Self::default();
        let content;
        parenthesized!(content in input);

        while !content.is_empty() {
            let ident: Ident = content.parse()?;
            let len = match ident.to_string().as_str() {
                "len" => {
                    content.parse::<Token![=]>()?;
                    Some(ArrayLength::Expr(syn::parse_str(
                        &content.parse::<LitStr>()?.value(),
                    )?))
                }

                "fixed_len" => {
                    let bytes;
                    parenthesized!(bytes in content);
                    Some(ArrayLength::Fixed(bytes.parse()?))
                }

                "greedy" => Some(ArrayLength::Greedy(ident.clone())),

                "fallback" => {
                    params.fallback = true;
                    None
                }

                ident_str =>
                    return Err(Error::new_spanned(
                        &ident,
                        &format!("Unknown parameter `{}`", ident_str),
                    )),
            };

            if let Some(len) = len {
                if params.len.is_some() {
                    return Err(Error::new_spanned(len, "Duplicate length parameter"));
                }
                params.len = Some(len);
            }

            if !content.is_empty() {
                content.parse::<Token![,]>()?;
            }
        }

        Ok(params)
    }
}

pub struct Field {
    pub ident: Ident,
    pub type_info: TypeInfo,
}

pub struct Variant {
    pub ident: Ident,
    pub fallback: bool,
}

#[derive(Clone, Copy)]
pub enum Repr {
    U8,
    U16,
    U32,
}

pub enum ArrayLength {
    Expr(Box<Expr>),
    Fixed(LitInt),
    Greedy(Ident),
}

impl ToTokens for ArrayLength {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            Self::Expr(expr) => expr.to_tokens(tokens),
            Self::Fixed(lit) => lit.to_tokens(tokens),
            Self::Greedy(ident) => ident.to_tokens(tokens),
        }
    }
}

pub enum TypeInfo {
    Regular(Box<Type>),
    Array {
        length: ArrayLength,
        outer: Box<Type>,
        inner: ArrayType,
    },
}

pub enum ArrayType {
    Vec(Box<Type>),
    Vecu8,
    String,
}
