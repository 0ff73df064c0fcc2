//! Projection of raw API entries into typed recipes.
//!
//! Entries arrive as loosely-typed JSON field maps. [`Recipe::from_entry`]
//! checks every field the page needs and names the offending field when one
//! is missing or has the wrong shape, so a malformed entry fails with a
//! readable error instead of half-rendering.
//!
//! | Field | Type | Required |
//! |-------|------|----------|
//! | `slug` | string | yes |
//! | `title` | string | yes |
//! | `cookingTime` | number (minutes) | yes |
//! | `ingredients` | array of strings | yes |
//! | `featuredImage` | link to an image asset | yes |
//! | `method` | rich-text document | no (empty when absent) |

use crate::content::{Entry, Includes};
use crate::richtext::Document;
use crate::types::AssetRef;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("entry {entry}: missing field `{field}`")]
    MissingField { entry: String, field: &'static str },
    #[error("entry {entry}: field `{field}` should be {expected}")]
    WrongType {
        entry: String,
        field: &'static str,
        expected: &'static str,
    },
    #[error("entry {entry}: asset {asset} is not included in the response")]
    UnresolvedAsset { entry: String, asset: String },
    #[error("entry {entry}: asset {asset} has no image file details")]
    MissingImageDetails { entry: String, asset: String },
    #[error("entry {entry}: invalid rich text in `{field}`: {source}")]
    RichText {
        entry: String,
        field: &'static str,
        source: serde_json::Error,
    },
}

/// A recipe ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: String,
    pub slug: String,
    pub title: String,
    /// Minutes. Integer values display without a decimal point.
    pub cooking_time: f64,
    pub ingredients: Vec<String>,
    pub method: Document,
    pub featured_image: AssetRef,
}

impl Recipe {
    /// Project an entry's fields, resolving links against `includes`.
    pub fn from_entry(entry: &Entry, includes: &Includes) -> Result<Self, EntryError> {
        let fields = FieldReader { entry };

        let slug = fields.string("slug")?;
        let title = fields.string("title")?;
        let cooking_time = fields
            .required("cookingTime")?
            .as_f64()
            .ok_or_else(|| fields.wrong_type("cookingTime", "a number"))?;
        let ingredients = fields
            .required("ingredients")?
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|i| i.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| fields.wrong_type("ingredients", "an array of strings"))?;

        let featured_image = fields.asset("featuredImage", includes)?;

        let method = match entry.fields.get("method") {
            None | Some(Value::Null) => Document::default(),
            Some(value) => Document::from_value(value, |id| includes.asset_ref(id)).map_err(
                |source| EntryError::RichText {
                    entry: entry.sys.id.clone(),
                    field: "method",
                    source,
                },
            )?,
        };

        Ok(Self {
            id: entry.sys.id.clone(),
            slug,
            title,
            cooking_time,
            ingredients,
            method,
            featured_image,
        })
    }
}

struct FieldReader<'a> {
    entry: &'a Entry,
}

impl<'a> FieldReader<'a> {
    fn required(&self, field: &'static str) -> Result<&'a Value, EntryError> {
        match self.entry.fields.get(field) {
            Some(Value::Null) | None => Err(EntryError::MissingField {
                entry: self.entry.sys.id.clone(),
                field,
            }),
            Some(value) => Ok(value),
        }
    }

    fn wrong_type(&self, field: &'static str, expected: &'static str) -> EntryError {
        EntryError::WrongType {
            entry: self.entry.sys.id.clone(),
            field,
            expected,
        }
    }

    fn string(&self, field: &'static str) -> Result<String, EntryError> {
        self.required(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.wrong_type(field, "a string"))
    }

    fn asset(&self, field: &'static str, includes: &Includes) -> Result<AssetRef, EntryError> {
        let id = self
            .required(field)?
            .pointer("/sys/id")
            .and_then(Value::as_str)
            .ok_or_else(|| self.wrong_type(field, "a link to an asset"))?;
        let asset = includes
            .asset(id)
            .ok_or_else(|| EntryError::UnresolvedAsset {
                entry: self.entry.sys.id.clone(),
                asset: id.to_string(),
            })?;
        asset.image_ref().ok_or_else(|| EntryError::MissingImageDetails {
            entry: self.entry.sys.id.clone(),
            asset: id.to_string(),
        })
    }
}
