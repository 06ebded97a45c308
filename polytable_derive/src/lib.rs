//! The implementation of the `PolyTable` proc-macro.
use darling::{util::PathList, FromDeriveInput, FromField, FromMeta};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashMap;

#[proc_macro_derive(PolyTable, attributes(polytable))]
pub fn poly_table_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    match impl_poly_table(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn impl_poly_table(ast: &syn::DeriveInput) -> syn::Result<TokenStream> {
    let options = match PolyTableOptions::from_derive_input(ast) {
        Ok(options) => options,
        Err(err) => return Ok(err.write_errors()),
    };

    let ident = &options.ident;
    let vis = &options.vis;
    let module = options
        .module
        .clone()
        .unwrap_or_else(|| format_ident!("{}", to_snake(&ident.to_string())));

    let fields = options.data.as_ref().take_struct().unwrap();
    let mut field_types = HashMap::new();

    for field in fields {
        let path = syn::Path::from(field.ident.clone().unwrap());
        field_types.insert(path, field.ty.clone());
    }

    let key_field = &options.key;
    let key_ty = field_types
        .get(&syn::Path::from(key_field.clone()))
        .ok_or_else(|| {
            syn::Error::new_spanned(key_field, "key does not name a field of the struct")
        })?
        .clone();

    let policy = options.policy.unwrap_or(PolicyArg::NoInvalidate).path();
    let status = if options.per_thread_status {
        quote!(::polytable::ThreadStatus)
    } else {
        quote!(::polytable::SharedStatus)
    };

    let mut spec_idents = Vec::new();
    let mut spec_defs = Vec::new();
    let mut getters = Vec::new();

    for index in options.indices.iter() {
        let spec_ident = index.spec_ident();
        let getter = index.getter();
        let idents: Vec<&syn::Ident> = index
            .fields
            .iter()
            .map(|path| path.get_ident().unwrap())
            .collect();
        let types: Vec<syn::Type> = index
            .fields
            .iter()
            .map(|path| {
                field_types.get(path).cloned().ok_or_else(|| {
                    syn::Error::new_spanned(path, "index does not name a field of the struct")
                })
            })
            .collect::<syn::Result<_>>()?;

        let map = if index.unique {
            quote!(::polytable::UniqueHashMap<Self::SubKey, R>)
        } else {
            quote!(::polytable::MultiHashMap<Self::SubKey, R>)
        };

        spec_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #spec_ident;

            impl ::polytable::IndexSpec<#key_ty, #ident> for #spec_ident {
                type SubKey = (#(#types),*);
                type Map<R: Clone + Eq> = #map;

                fn project(_key: &#key_ty, item: &#ident) -> Self::SubKey {
                    (#(item.#idents.clone()),*)
                }
            }
        });

        if index.unique {
            getters.push(quote! {
                pub fn #getter(&self, #(#idents: #types),*) -> Option<::polytable::Handle> {
                    self.inner.by::<#spec_ident, _>().find(&(#(#idents),*))
                }
            });
        } else {
            getters.push(quote! {
                pub fn #getter(
                    &self,
                    #(#idents: #types),*
                ) -> impl Iterator<Item = ::polytable::Handle> + '_ {
                    self.inner.by::<#spec_ident, _>().get_all(&(#(#idents),*))
                }
            });
        }

        spec_idents.push(spec_ident);
    }

    let alias = format_ident!("{}Table", ident);

    Ok(quote! {
        #vis mod #module {
            use super::*;

            #(#spec_defs)*

            /// The table's fully spelled out container type.
            pub type Inner = ::polytable::MultiIndex<
                #key_ty,
                #ident,
                #policy,
                ::polytable::UniqueHashMap<#key_ty, usize>,
                (#(#spec_idents,)*),
                #status,
            >;

            #[derive(Clone, Debug, Default)]
            pub struct Table {
                inner: Inner,
            }

            impl Table {
                #[inline]
                pub fn new() -> Self {
                    Self::default()
                }

                pub fn insert(&mut self, row: #ident) -> ::polytable::Handle {
                    let key = row.#key_field.clone();
                    self.inner.insert(key, row)
                }

                pub fn try_insert(
                    &mut self,
                    row: #ident,
                ) -> Result<::polytable::Handle, ::polytable::Duplicate<#key_ty, #ident>> {
                    let key = row.#key_field.clone();
                    self.inner.try_insert(key, row)
                }

                #(#getters)*
            }

            impl ::core::ops::Deref for Table {
                type Target = Inner;

                #[inline]
                fn deref(&self) -> &Inner {
                    &self.inner
                }
            }

            impl ::core::ops::DerefMut for Table {
                #[inline]
                fn deref_mut(&mut self) -> &mut Inner {
                    &mut self.inner
                }
            }

            impl ::std::iter::FromIterator<#ident> for Table {
                fn from_iter<T: ::std::iter::IntoIterator<Item = #ident>>(iter: T) -> Self {
                    let mut table = Self::new();

                    for item in iter {
                        table.insert(item);
                    }

                    table
                }
            }
        }

        #vis type #alias = #module::Table;
    })
}

#[derive(FromDeriveInput)]
#[darling(attributes(polytable), supports(struct_named))]
struct PolyTableOptions {
    ident: syn::Ident,
    vis: syn::Visibility,
    data: darling::ast::Data<(), FieldOptions>,
    /// Field holding the primary key. The primary index is unique on it.
    key: syn::Ident,
    #[darling(default)]
    module: Option<syn::Ident>,
    #[darling(default)]
    policy: Option<PolicyArg>,
    #[darling(default)]
    per_thread_status: bool,
    #[darling(default, multiple, rename = "index")]
    indices: Vec<IndexAttr>,
}

#[derive(FromMeta)]
struct IndexAttr {
    fields: PathList,
    #[darling(default)]
    getter: Option<syn::Ident>,
    #[darling(default)]
    unique: bool,
}

impl IndexAttr {
    pub fn getter(&self) -> syn::Ident {
        self.getter.clone().unwrap_or_else(|| {
            syn::Ident::new(
                &format!("get_by_{}", self.fields().join("_")),
                proc_macro2::Span::call_site(),
            )
        })
    }

    pub fn spec_ident(&self) -> syn::Ident {
        let camel: String = self.fields().iter().map(|field| to_camel(field)).collect();
        syn::Ident::new(&format!("By{camel}"), proc_macro2::Span::call_site())
    }

    pub fn fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| field.get_ident().unwrap().to_string())
            .collect()
    }
}

#[derive(FromField)]
struct FieldOptions {
    ident: Option<syn::Ident>,
    ty: syn::Type,
}

#[derive(Clone, Copy, FromMeta)]
#[darling(rename_all = "snake_case")]
enum PolicyArg {
    NoInvalidate,
    UpdatePointer,
    UpdatePointerTombstones,
    TranslationArray,
    TranslationArrayTombstones,
    KeyLookup,
}

impl PolicyArg {
    fn path(self) -> TokenStream {
        match self {
            PolicyArg::NoInvalidate => quote!(::polytable::NoInvalidate),
            PolicyArg::UpdatePointer => quote!(::polytable::UpdatePointer),
            PolicyArg::UpdatePointerTombstones => quote!(::polytable::UpdatePointerTombstones),
            PolicyArg::TranslationArray => quote!(::polytable::TranslationArray),
            PolicyArg::TranslationArrayTombstones => {
                quote!(::polytable::TranslationArrayTombstones)
            }
            PolicyArg::KeyLookup => quote!(::polytable::KeyLookup),
        }
    }
}

fn to_snake(ident: &str) -> String {
    let mut out = String::new();
    for (i, ch) in ident.chars().enumerate() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn to_camel(snake: &str) -> String {
    snake
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
