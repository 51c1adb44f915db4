/*
    This file is part of Stubify.

    Stubify is free software: you can redistribute it and/or modify
    it under the terms of the GNU Lesser General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    Stubify is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with Stubify. (LICENSE.md)  If not, see <https://www.gnu.org/licenses/>.
*/
//! Derive macros for the fixed-layout structures of a class file.
//!
//! `#[derive(ReadWrite)]` reads and writes every field in declaration order.
//! Enums need `#[tag_type(..)]` and are prefixed with their tag, which is
//! taken from `#[tag(..)]`, the explicit discriminant, or the previous tag plus one.
use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{
    parse_macro_input, Data, DeriveInput, Error, Expr, ExprLit, Fields, Index, Lit, LitInt,
    Result, Type,
};

#[proc_macro_derive(ReadWrite, attributes(tag_type, tag))]
pub fn derive_readwrite(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    derive_readwrite_inner(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn as_readwrite(ty: &Type) -> TokenStream2 {
    let span = ty.span();
    quote_spanned! { span =>
        <#ty as crate::ReadWrite>
    }
}

fn field_idents(fields: &Fields) -> Vec<Ident> {
    match fields {
        Fields::Named(named) => named.named.iter().filter_map(|f| f.ident.clone()).collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|n| Ident::new(&format!("__field{}", n), Span::call_site()))
            .collect(),
        Fields::Unit => Vec::new(),
    }
}

fn construct(path: TokenStream2, fields: &Fields, idents: &[Ident]) -> TokenStream2 {
    match fields {
        Fields::Named(_) => quote! { #path { #(#idents),* } },
        Fields::Unnamed(_) => quote! { #path( #(#idents),* ) },
        Fields::Unit => quote! { #path },
    }
}

fn reads(fields: &Fields, idents: &[Ident]) -> TokenStream2 {
    let types = fields.iter().map(|f| as_readwrite(&f.ty));
    quote! {
        #(
            let #idents = #types::read_from(reader)?;
        )*
    }
}

fn derive_readwrite_inner(input: DeriveInput) -> Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    match &input.data {
        Data::Struct(s) => {
            let idents = field_idents(&s.fields);
            let read_fields = reads(&s.fields, &idents);
            let construct = construct(quote! { Self }, &s.fields, &idents);
            let types = s.fields.iter().map(|f| as_readwrite(&f.ty));
            let accessors = match &s.fields {
                Fields::Named(_) => idents.iter().map(|i| quote! { self.#i }).collect(),
                Fields::Unnamed(_) => (0..idents.len())
                    .map(Index::from)
                    .map(|i| quote! { self.#i })
                    .collect(),
                Fields::Unit => Vec::new(),
            };
            Ok(quote! {
                impl #impl_generics crate::ReadWrite for #name #ty_generics #where_clause {
                    fn read_from<Reader: std::io::Read>(reader: &mut Reader) -> crate::error::Result<Self> {
                        #read_fields
                        Ok(#construct)
                    }
                    fn write_to<Writer: std::io::Write>(&self, writer: &mut Writer) -> crate::error::Result<()> {
                        #(
                            #types::write_to(&#accessors, writer)?;
                        )*
                        Ok(())
                    }
                }
            })
        }
        Data::Enum(e) => {
            let tag_type: Type = input
                .attrs
                .iter()
                .find(|a| a.path.is_ident("tag_type"))
                .ok_or_else(|| Error::new(input.span(), "Couldn't find tag_type attribute"))?
                .parse_args()?;
            let tag_ty = as_readwrite(&tag_type);

            let mut next = 0u64;
            let mut tags = Vec::with_capacity(e.variants.len());
            for v in &e.variants {
                let explicit = match v.attrs.iter().find(|a| a.path.is_ident("tag")) {
                    Some(a) => Some(a.parse_args::<LitInt>()?),
                    None => match &v.discriminant {
                        Some((_, Expr::Lit(ExprLit { lit: Lit::Int(l), .. }))) => Some(l.clone()),
                        _ => None,
                    },
                };
                let value = match explicit {
                    Some(lit) => lit.base10_parse::<u64>()?,
                    None => next,
                };
                next = value + 1;
                tags.push(LitInt::new(&value.to_string(), v.span()));
            }

            let mut read_arms = Vec::with_capacity(tags.len());
            let mut write_arms = Vec::with_capacity(tags.len());
            for (v, tag) in e.variants.iter().zip(&tags) {
                let variant = &v.ident;
                let idents = field_idents(&v.fields);
                let read_fields = reads(&v.fields, &idents);
                let construct = construct(quote! { Self::#variant }, &v.fields, &idents);
                read_arms.push(quote! {
                    #tag => {
                        #read_fields
                        Ok(#construct)
                    }
                });
                let pattern = match &v.fields {
                    Fields::Named(_) => quote! { Self::#variant { #(ref #idents),* } },
                    Fields::Unnamed(_) => quote! { Self::#variant( #(ref #idents),* ) },
                    Fields::Unit => quote! { Self::#variant },
                };
                let types = v.fields.iter().map(|f| as_readwrite(&f.ty));
                write_arms.push(quote! {
                    #pattern => {
                        #tag_ty::write_to(&#tag, writer)?;
                        #(
                            #types::write_to(#idents, writer)?;
                        )*
                        Ok(())
                    }
                });
            }

            Ok(quote! {
                impl #impl_generics crate::ReadWrite for #name #ty_generics #where_clause {
                    fn read_from<Reader: std::io::Read>(reader: &mut Reader) -> crate::error::Result<Self> {
                        let tag = #tag_ty::read_from(reader)?;
                        match tag {
                            #(#read_arms)*
                            _ => Err(crate::error::Error::Invalid("tag", tag.to_string().into())),
                        }
                    }
                    fn write_to<Writer: std::io::Write>(&self, writer: &mut Writer) -> crate::error::Result<()> {
                        match self {
                            #(#write_arms)*
                        }
                    }
                }
            })
        }
        Data::Union(_) => Err(Error::new(
            input.span(),
            "This macro should not be used on a union type",
        )),
    }
}
