use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, Attribute, Data, DeriveInput, Fields, Ident, LitInt, Member, Type,
};

/// Argument of `#[response_status(...)]`
enum StatusArg {
    /// An expression of type `Option<StatusCode>`
    Code(TokenStream2),
    /// Delegate to the single wrapped exception
    Inherit,
}

impl Parse for StatusArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitInt) {
            let lit: LitInt = input.parse()?;
            let code: u16 = lit.base10_parse()?;
            if !(100..=999).contains(&code) {
                return Err(syn::Error::new(
                    lit.span(),
                    "status code must be between 100 and 999",
                ));
            }
            return Ok(StatusArg::Code(quote! {
                ::exceptionhandler::axum::http::StatusCode::from_u16(#code).ok()
            }));
        }

        let ident: Ident = input.parse()?;
        if ident == "inherit" {
            Ok(StatusArg::Inherit)
        } else {
            Ok(StatusArg::Code(quote! {
                ::core::option::Option::Some(::exceptionhandler::axum::http::StatusCode::#ident)
            }))
        }
    }
}

/// A field tagged with `#[origin]`
struct CallSiteField {
    member: Member,
    optional: bool,
}

pub fn derive_exception(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    generate_exception_impl(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn generate_exception_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let type_status = status_attr(&input.attrs)?;

    let (status_body, call_site_body) = match &input.data {
        Data::Struct(data) => {
            let status = match &type_status {
                Some(StatusArg::Code(code)) => code.clone(),
                Some(StatusArg::Inherit) => {
                    let member = inherit_member(&data.fields, name.span())?;
                    quote!({
                        use ::exceptionhandler::Exception as _;
                        self.#member.declared_status()
                    })
                }
                None => quote!(::core::option::Option::None),
            };

            let call_site = match call_site_field(&data.fields)? {
                Some(CallSiteField {
                    member,
                    optional: true,
                }) => quote!(self.#member.as_ref()),
                Some(CallSiteField {
                    member,
                    optional: false,
                }) => quote!(::core::option::Option::Some(&self.#member)),
                None => quote!(::core::option::Option::None),
            };

            (status, call_site)
        }
        Data::Enum(data) => {
            if data.variants.is_empty() {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Exception)] cannot be applied to an empty enum",
                ));
            }

            let mut status_arms = Vec::new();
            let mut call_site_arms = Vec::new();

            for variant in &data.variants {
                let ident = &variant.ident;
                // A variant-level status overrides the one declared on the enum.
                let status = status_attr(&variant.attrs)?.or(match &type_status {
                    Some(StatusArg::Code(code)) => Some(StatusArg::Code(code.clone())),
                    Some(StatusArg::Inherit) => Some(StatusArg::Inherit),
                    None => None,
                });

                status_arms.push(match status {
                    Some(StatusArg::Code(code)) => quote!(Self::#ident { .. } => #code,),
                    Some(StatusArg::Inherit) => {
                        let member = inherit_member(&variant.fields, ident.span())?;
                        quote! {
                            Self::#ident { #member: __inner, .. } => {
                                use ::exceptionhandler::Exception as _;
                                __inner.declared_status()
                            }
                        }
                    }
                    None => quote!(Self::#ident { .. } => ::core::option::Option::None,),
                });

                call_site_arms.push(match call_site_field(&variant.fields)? {
                    Some(CallSiteField {
                        member,
                        optional: true,
                    }) => quote!(Self::#ident { #member: __site, .. } => __site.as_ref(),),
                    Some(CallSiteField {
                        member,
                        optional: false,
                    }) => quote! {
                        Self::#ident { #member: __site, .. } => ::core::option::Option::Some(__site),
                    },
                    None => quote!(Self::#ident { .. } => ::core::option::Option::None,),
                });
            }

            (
                quote!(match self { #(#status_arms)* }),
                quote!(match self { #(#call_site_arms)* }),
            )
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Exception)] can only be applied to structs and enums",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::exceptionhandler::Exception for #name #ty_generics #where_clause {
            fn declared_status(
                &self,
            ) -> ::core::option::Option<::exceptionhandler::axum::http::StatusCode> {
                #status_body
            }

            fn call_site(&self) -> ::core::option::Option<&::exceptionhandler::CallSite> {
                #call_site_body
            }
        }
    })
}

fn status_attr(attrs: &[Attribute]) -> syn::Result<Option<StatusArg>> {
    let mut found = None;
    for attr in attrs {
        if !attr.path().is_ident("response_status") {
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new_spanned(
                attr,
                "duplicate #[response_status] attribute",
            ));
        }
        found = Some(attr.parse_args::<StatusArg>()?);
    }
    Ok(found)
}

fn has_origin_attr(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("origin"))
}

fn member_of(index: usize, ident: Option<&Ident>) -> Member {
    match ident {
        Some(ident) => Member::Named(ident.clone()),
        None => Member::Unnamed(index.into()),
    }
}

fn call_site_field(fields: &Fields) -> syn::Result<Option<CallSiteField>> {
    let mut found = None;
    for (index, field) in fields.iter().enumerate() {
        if !has_origin_attr(&field.attrs) {
            continue;
        }
        if found.is_some() {
            return Err(syn::Error::new_spanned(
                field,
                "only one field may be marked #[origin]",
            ));
        }
        found = Some(CallSiteField {
            member: member_of(index, field.ident.as_ref()),
            optional: is_option(&field.ty),
        });
    }
    Ok(found)
}

/// The wrapped exception of an `inherit` status: the only field not marked `#[origin]`
fn inherit_member(fields: &Fields, span: Span) -> syn::Result<Member> {
    let mut candidates = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| !has_origin_attr(&field.attrs));

    match (candidates.next(), candidates.next()) {
        (Some((index, field)), None) => Ok(member_of(index, field.ident.as_ref())),
        _ => Err(syn::Error::new(
            span,
            "#[response_status(inherit)] requires exactly one wrapped exception field",
        )),
    }
}

fn is_option(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}
