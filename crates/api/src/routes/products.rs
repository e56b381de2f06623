//! Product catalog route handlers.
//!
//! Simple persistence plus image uploads; the only invariant lives in the
//! schema (non-negative price and stock). Create and update accept
//! multipart form data so the image can ride along with the fields.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Value, json};

use sugarloaf_core::{CategoryId, ProductId};

use crate::db::products::{NewProduct, ProductRepository, ProductUpdate};
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::services::media::extension_for;
use crate::state::AppState;
use crate::validate::FieldErrors;

/// Maximum accepted image upload size (2 MB).
const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Product payload.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    /// Absolute URL into the media store, if an image is set.
    pub image: Option<String>,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductResponse {
    fn new(product: &Product, base_url: &str) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            image: product
                .image
                .as_ref()
                .map(|reference| format!("{base_url}{reference}")),
            category_id: product.category_id,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Text fields plus an optional image pulled out of a multipart form.
struct ProductForm {
    fields: BTreeMap<String, String>,
    image: Option<(String, Vec<u8>)>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut fields = BTreeMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };
        if name == "image" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            image = Some((content_type, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            fields.insert(name, value);
        }
    }

    Ok(ProductForm { fields, image })
}

/// Validate an uploaded image, returning its target extension.
fn check_image(errors: &mut FieldErrors, image: &(String, Vec<u8>)) -> Option<&'static str> {
    let (content_type, bytes) = image;
    if bytes.len() > MAX_IMAGE_BYTES {
        errors.add("image", "The image may not be greater than 2048 kilobytes.");
    }
    let ext = extension_for(content_type);
    if ext.is_none() {
        errors.add("image", "The image must be a file of type: jpeg, png, jpg.");
    }
    ext
}

fn parse_price(errors: &mut FieldErrors, raw: &str) -> Option<Decimal> {
    match raw.parse::<Decimal>() {
        Ok(price) if price >= Decimal::ZERO => Some(price),
        Ok(_) => {
            errors.add("price", "The price must be at least 0.");
            None
        }
        Err(_) => {
            errors.add("price", "The price must be a number.");
            None
        }
    }
}

fn parse_stock(errors: &mut FieldErrors, raw: &str) -> Option<i32> {
    match raw.parse::<i32>() {
        Ok(stock) if stock >= 0 => Some(stock),
        Ok(_) => {
            errors.add("stock", "The stock must be at least 0.");
            None
        }
        Err(_) => {
            errors.add("stock", "The stock must be an integer.");
            None
        }
    }
}

fn parse_category(errors: &mut FieldErrors, raw: &str) -> Option<CategoryId> {
    match raw.parse::<i32>() {
        Ok(id) => Some(CategoryId::new(id)),
        Err(_) => {
            errors.add("category_id", "The category id must be an integer.");
            None
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// List all products.
///
/// GET /api/products
pub async fn index(State(state): State<AppState>) -> Result<Json<Value>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    let data: Vec<ProductResponse> = products
        .iter()
        .map(|p| ProductResponse::new(p, &state.config().base_url))
        .collect();
    Ok(Json(json!({ "data": data })))
}

/// Show a product.
///
/// GET /api/products/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Value>> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;

    Ok(Json(json!({
        "data": ProductResponse::new(&product, &state.config().base_url),
    })))
}

/// Create a product.
///
/// POST /api/products (multipart: name, description?, price, stock,
/// category_id?, image?)
pub async fn store(State(state): State<AppState>, multipart: Multipart) -> Result<Json<Value>> {
    let form = read_form(multipart).await?;
    let mut errors = FieldErrors::new();

    let name = form.fields.get("name").map(String::as_str).unwrap_or("");
    if name.trim().is_empty() {
        errors.add("name", "The name field is required.");
    } else if name.len() > 255 {
        errors.add("name", "The name may not be greater than 255 characters.");
    }

    let price = match form.fields.get("price") {
        Some(raw) => parse_price(&mut errors, raw),
        None => {
            errors.add("price", "The price field is required.");
            None
        }
    };
    let stock = match form.fields.get("stock") {
        Some(raw) => parse_stock(&mut errors, raw),
        None => {
            errors.add("stock", "The stock field is required.");
            None
        }
    };
    let category_id = match form.fields.get("category_id") {
        Some(raw) => parse_category(&mut errors, raw),
        None => None,
    };
    let ext = form
        .image
        .as_ref()
        .and_then(|image| check_image(&mut errors, image));

    errors.into_result()?;
    let (Some(price), Some(stock)) = (price, stock) else {
        return Err(AppError::BadRequest("missing fields".to_owned()));
    };

    let image = match (form.image, ext) {
        (Some((_, bytes)), Some(ext)) => Some(state.media().put("products", ext, &bytes).await?),
        _ => None,
    };

    let product = ProductRepository::new(state.pool())
        .create(&NewProduct {
            name: name.trim().to_owned(),
            description: form.fields.get("description").cloned(),
            price,
            stock,
            image,
            category_id,
        })
        .await?;

    Ok(Json(json!({
        "message": "Product created successfully",
        "data": ProductResponse::new(&product, &state.config().base_url),
    })))
}

/// Partially update a product; absent fields are left unchanged.
///
/// PUT /api/products/{id} (multipart, same fields as create)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;

    let form = read_form(multipart).await?;
    let mut errors = FieldErrors::new();

    let name = form.fields.get("name").cloned();
    if let Some(name) = &name
        && name.len() > 255
    {
        errors.add("name", "The name may not be greater than 255 characters.");
    }
    let price = form
        .fields
        .get("price")
        .and_then(|raw| parse_price(&mut errors, raw));
    let stock = form
        .fields
        .get("stock")
        .and_then(|raw| parse_stock(&mut errors, raw));
    let category_id = form
        .fields
        .get("category_id")
        .and_then(|raw| parse_category(&mut errors, raw));
    let ext = form
        .image
        .as_ref()
        .and_then(|image| check_image(&mut errors, image));

    errors.into_result()?;

    let mut product = repo
        .update(
            id,
            &ProductUpdate {
                name,
                description: form.fields.get("description").cloned(),
                price,
                stock,
                category_id,
            },
        )
        .await?;

    if let (Some((_, bytes)), Some(ext)) = (form.image, ext) {
        if let Some(old) = &existing.image {
            state.media().delete(old).await?;
        }
        let reference = state.media().put("products", ext, &bytes).await?;
        product = repo.set_image(id, Some(&reference)).await?;
    }

    Ok(Json(json!({
        "message": "Product updated successfully",
        "data": ProductResponse::new(&product, &state.config().base_url),
    })))
}

/// Delete a product and its image blob.
///
/// DELETE /api/products/{id}
pub async fn destroy(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Value>> {
    let id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_owned()))?;

    if let Some(image) = &product.image {
        state.media().delete(image).await?;
    }
    repo.delete(id).await?;

    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
