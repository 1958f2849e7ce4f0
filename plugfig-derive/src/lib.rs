//! Derive macro for plugfig.
//!
//! `#[derive(Reflect)]` turns a struct with named fields into a static field
//! table plus indexed accessors, which is everything the plugfig field view
//! needs to walk and mutate a configuration struct without runtime
//! reflection.
//!
//! ```ignore
//! #[derive(Reflect, Default, Clone)]
//! struct Config {
//!     #[plugfig(default = "localhost", env = "DB_HOST", usage = "database host")]
//!     host: String,
//!     #[plugfig(nested)]
//!     redis: Redis,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Words that change how a field is walked rather than declaring a tag.
const SHAPE_WORDS: &[&str] = &["nested", "flatten", "text", "skip"];

/// Derives `plugfig::Reflect` for a struct with named fields.
///
/// Field attributes (`#[plugfig(...)]`, may be repeated):
///
/// * `nested` - the field is a struct deriving `Reflect`; adds a name segment.
/// * `flatten` - like `nested`, without a name segment (embedded struct).
/// * `text` - the field type implements `plugfig::TextDecode`.
/// * `skip` - the field is ignored entirely.
/// * `key = "value"` - any other pair is recorded as a tag for plugins.
#[proc_macro_derive(Reflect, attributes(plugfig))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Clone, Copy, PartialEq)]
enum Shape {
    Leaf,
    Text,
    Nested,
    Flatten,
}

struct FieldSpec {
    member: syn::Ident,
    shape: Shape,
    tags: Vec<(String, String)>,
}

fn expand(input: DeriveInput) -> Result<TokenStream2, syn::Error> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect can only be derived for structs",
        ));
    };

    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect requires a struct with named fields",
        ));
    };

    let mut specs = Vec::new();
    for field in &named.named {
        if let Some(spec) = parse_field(field)? {
            specs.push(spec);
        }
    }

    let infos = specs.iter().map(|spec| {
        let ident = spec.member.to_string();
        let ident = ident.strip_prefix("r#").unwrap_or(&ident).to_string();
        let shape = match spec.shape {
            Shape::Leaf => quote!(::plugfig::Shape::Leaf),
            Shape::Text => quote!(::plugfig::Shape::Text),
            Shape::Nested => quote!(::plugfig::Shape::Nested),
            Shape::Flatten => quote!(::plugfig::Shape::Flatten),
        };
        let tags = spec.tags.iter().map(|(key, value)| quote!((#key, #value)));
        quote! {
            ::plugfig::FieldInfo::new(#ident, #shape, ::plugfig::Tags::new(&[#(#tags),*]))
        }
    });

    let mut_arms = specs.iter().enumerate().map(|(index, spec)| {
        let member = &spec.member;
        let variant = accessor_variant(spec.shape);
        quote! {
            #index => ::core::option::Option::Some(
                ::plugfig::FieldMut::#variant(&mut self.#member)
            )
        }
    });

    let ref_arms = specs.iter().enumerate().map(|(index, spec)| {
        let member = &spec.member;
        let variant = accessor_variant(spec.shape);
        quote! {
            #index => ::core::option::Option::Some(
                ::plugfig::FieldRef::#variant(&self.#member)
            )
        }
    });

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::plugfig::Reflect for #name #ty_generics #where_clause {
            fn fields(&self) -> &'static [::plugfig::FieldInfo] {
                const FIELDS: &[::plugfig::FieldInfo] = &[#(#infos),*];
                FIELDS
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<::plugfig::FieldMut<'_>> {
                match index {
                    #(#mut_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn field_ref(&self, index: usize) -> ::core::option::Option<::plugfig::FieldRef<'_>> {
                match index {
                    #(#ref_arms,)*
                    _ => ::core::option::Option::None,
                }
            }

            fn target_mut(&mut self) -> ::core::option::Option<&mut dyn ::plugfig::Reflect> {
                ::core::option::Option::Some(self)
            }

            fn target_ref(&self) -> ::core::option::Option<&dyn ::plugfig::Reflect> {
                ::core::option::Option::Some(self)
            }
        }
    })
}

fn accessor_variant(shape: Shape) -> TokenStream2 {
    match shape {
        Shape::Leaf => quote!(Leaf),
        Shape::Text => quote!(Text),
        Shape::Nested | Shape::Flatten => quote!(Nested),
    }
}

/// Collect the shape words and tags of one field. `None` means skipped.
fn parse_field(field: &syn::Field) -> Result<Option<FieldSpec>, syn::Error> {
    let Some(member) = field.ident.clone() else {
        return Err(syn::Error::new_spanned(field, "expected a named field"));
    };

    let mut shape = Shape::Leaf;
    let mut skip = false;
    let mut tags: Vec<(String, String)> = Vec::new();

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("plugfig")) {
        attr.parse_nested_meta(|meta| {
            let Some(key) = meta.path.get_ident().map(|i| i.to_string()) else {
                return Err(meta.error("expected a plain identifier"));
            };

            if SHAPE_WORDS.contains(&key.as_str()) {
                if meta.input.peek(syn::Token![=]) {
                    return Err(meta.error(format!("`{key}` does not take a value")));
                }
                let next = match key.as_str() {
                    "nested" => Shape::Nested,
                    "flatten" => Shape::Flatten,
                    "text" => Shape::Text,
                    _ => {
                        skip = true;
                        return Ok(());
                    }
                };
                if shape != Shape::Leaf && shape != next {
                    return Err(meta.error("conflicting field shapes"));
                }
                shape = next;
                return Ok(());
            }

            let value: LitStr = meta.value()?.parse()?;
            if tags.iter().any(|(existing, _)| *existing == key) {
                return Err(meta.error(format!("duplicate tag `{key}`")));
            }
            tags.push((key, value.value()));
            Ok(())
        })?;
    }

    if skip {
        return Ok(None);
    }

    Ok(Some(FieldSpec {
        member,
        shape,
        tags,
    }))
}
