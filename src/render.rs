//! Recipe page rendering.
//!
//! Two layers, both pure:
//!
//! - [`render_recipe`] projects a recipe (or its absence) into the page body
//!   fragment. An absent recipe renders the loading skeleton and touches no
//!   fields.
//! - [`render_page`] wraps that fragment in a full HTML document with the
//!   embedded stylesheet and config-driven color variables.
//!
//! ```text
//! div
//! ├── div.banner       image (https:{url}, width, height) + h2 title
//! └── div.info         cook time, ingredient list, div.method (rich text)
//! ```

use crate::config::{self, SiteConfig};
use crate::recipe::Recipe;
use crate::resolve::PageProps;
use crate::richtext;
use maud::{DOCTYPE, Markup, PreEscaped, html};

const CSS_STATIC: &str = include_str!("../static/style.css");

/// Build the page stylesheet: color variables followed by the static rules.
pub fn site_css(config: &SiteConfig) -> String {
    format!(
        "{}\n\n{}",
        config::generate_color_css(&config.colors),
        CSS_STATIC
    )
}

/// Renders the base HTML document structure
fn base_document(title: &str, css: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                main.recipe-page {
                    (content)
                }
            }
        }
    }
}

/// The loading placeholder shown until a recipe exists for the slug.
pub fn render_skeleton() -> Markup {
    html! {
        div.skeleton aria-busy="true" {
            div.s-banner {}
            div.s-header {}
            div.s-content {}
            div.s-content {}
            div.s-content {}
        }
    }
}

/// Render the page body for a recipe, or the skeleton when there is none.
pub fn render_recipe(recipe: Option<&Recipe>) -> Markup {
    let Some(recipe) = recipe else {
        return render_skeleton();
    };
    let image = &recipe.featured_image;

    html! {
        div {
            div.banner {
                img src=(image.image_src()) width=(image.width) height=(image.height)
                    alt=(image.title.as_deref().unwrap_or(&recipe.title));
                h2 { (recipe.title) }
            }
            div.info {
                p { "Takes about " (recipe.cooking_time) " minutes to cook." }
                h3 { "Ingredients:" }
                ul {
                    // Keyed by position: ingredient text may repeat
                    @for (idx, ingredient) in recipe.ingredients.iter().enumerate() {
                        li data-key=(idx) { (ingredient) }
                    }
                }
                div.method {
                    (richtext::render_document(&recipe.method))
                }
            }
        }
    }
}

/// Render a complete HTML document for resolved page props.
pub fn render_page(props: &PageProps, config: &SiteConfig) -> Markup {
    let heading = match &props.recipe {
        Some(recipe) => recipe.title.as_str(),
        None => "Loading",
    };
    let title = format!("{} | {}", heading, config.site.title);
    base_document(&title, &site_css(config), render_recipe(props.recipe.as_ref()))
}
