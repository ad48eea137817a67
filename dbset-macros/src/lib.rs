use convert_case::Case;
use convert_case::Casing;
use darling::FromDeriveInput;
use darling::FromField;
use proc_macro2::Ident;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::DeriveInput;
use syn::Type;

#[derive(Debug, FromField)]
#[darling(attributes(dbset))]
struct FieldReceiver {
    pub ident: Option<Ident>,
    pub ty:    Type,

    #[darling(default)]
    pub column: Option<String>,

    #[darling(default)]
    pub skip: bool,
}

#[derive(Debug, FromDeriveInput)]
#[darling(attributes(dbset), supports(struct_named))]
struct EntityReceiver {
    pub ident: Ident,
    pub data:  darling::ast::Data<(), FieldReceiver>,

    #[darling(default)]
    pub entity: Option<String>,

    #[darling(default)]
    pub primary_key: Option<String>,
}

#[derive(Debug)]
struct FieldInfo {
    pub field_name:  Ident,
    pub column_name: String,
    pub is_optional: bool,
    pub is_skipped:  bool,
}

#[derive(Debug)]
struct EntityInfo {
    pub struct_name: Ident,
    pub entity_name: String,
    pub primary_key: String,
    pub fields:      Vec<FieldInfo>,
}

impl FieldReceiver {
    pub fn to_field_info(self) -> darling::Result<FieldInfo> {
        let field_name = self.ident.ok_or_else(|| darling::Error::custom("Expected named field"))?;
        let column_name = self.column.unwrap_or_else(|| to_lower_camel(&field_name.to_string()));

        Ok(FieldInfo { field_name, column_name, is_optional: is_option_type(&self.ty), is_skipped: self.skip })
    }
}

impl EntityReceiver {
    pub fn to_entity_info(self) -> darling::Result<EntityInfo> {
        let entity_name = self.entity.unwrap_or_else(|| to_lower_camel(&self.ident.to_string()));
        let primary_key = self.primary_key.unwrap_or_else(|| "id".to_string());

        let fields = self
            .data
            .take_struct()
            .ok_or_else(|| darling::Error::unsupported_shape("Expected struct"))?
            .fields
            .into_iter()
            .map(FieldReceiver::to_field_info)
            .collect::<darling::Result<Vec<_>>>()?;

        Ok(EntityInfo { struct_name: self.ident, entity_name, primary_key, fields })
    }
}

/// Derives `dbset::Entity` for a struct with named fields.
///
/// Struct attributes: `#[dbset(entity = "...", primary_key = "...")]`.
/// Field attributes: `#[dbset(column = "...")]`, `#[dbset(skip)]`.
#[proc_macro_derive(Entity, attributes(dbset))]
pub fn derive_entity(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);

    let entity_info = match EntityReceiver::from_derive_input(&input).and_then(EntityReceiver::to_entity_info) {
        Ok(info) => info,
        Err(e) => return e.write_errors().into(),
    };

    proc_macro::TokenStream::from(impl_entity(&entity_info))
}

fn impl_entity(entity_info: &EntityInfo) -> TokenStream2 {
    let name = &entity_info.struct_name;
    let entity_name = &entity_info.entity_name;
    let primary_key = &entity_info.primary_key;

    let from_row_fields: Vec<_> = entity_info
        .fields
        .iter()
        .map(|f| {
            let field_name = &f.field_name;
            let column_name = &f.column_name;
            if f.is_skipped {
                quote! {
                    #field_name: ::core::default::Default::default()
                }
            } else if f.is_optional {
                quote! {
                    #field_name: match ::dbset::value::lookup(row, #column_name) {
                        Some(value) => ::dbset::FromValue::from_value(value.clone())?,
                        None => None,
                    }
                }
            } else {
                quote! {
                    #field_name: ::dbset::FromValue::from_value(
                        ::dbset::value::lookup(row, #column_name)
                            .cloned()
                            .ok_or_else(|| ::dbset::Error::ColumnNotFound(#column_name.to_string()))?,
                    )?
                }
            }
        })
        .collect();

    let into_row_fields: Vec<_> = entity_info
        .fields
        .iter()
        .filter(|f| !f.is_skipped)
        .map(|f| {
            let field_name = &f.field_name;
            let column_name = &f.column_name;
            quote! {
                row.insert(#column_name.to_string(), ::dbset::IntoValue::into_value(self.#field_name));
            }
        })
        .collect();

    quote! {
        impl ::dbset::Entity for #name {
            fn entity_name() -> &'static str {
                #entity_name
            }

            fn primary_key() -> &'static str {
                #primary_key
            }

            fn from_row(row: &::dbset::Row) -> ::dbset::Result<Self> {
                Ok(Self {
                    #(#from_row_fields),*
                })
            }

            fn into_row(self) -> ::dbset::Row {
                let mut row = ::dbset::Row::new();
                #(#into_row_fields)*
                row
            }
        }
    }
}

fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "Option";
        }
    }
    false
}

/// `order_item` / `OrderItem` → `orderItem`.
fn to_lower_camel(name: &str) -> String {
    name.trim_start_matches("r#").to_case(Case::Camel)
}
