use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use axum::Form;

use crate::error::AppError;
use crate::service::{ImageUpload, PostForm};
use crate::state::AppState;

/// Post fields from a create/update body.
///
/// `application/x-www-form-urlencoded` bodies carry text fields only;
/// `multipart/form-data` bodies may also carry the `image` file. Any other
/// body (or none) reads as an empty form. Repeated fields keep the first value.
pub struct PostFormBody(pub PostForm);

impl FromRequest<AppState> for PostFormBody {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state).await?;
            let mut form = PostForm::default();
            for (name, value) in pairs {
                if let Some(slot) = text_slot(&mut form, &name) {
                    slot.get_or_insert(value);
                }
            }
            return Ok(PostFormBody(form));
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state).await?;
            return Ok(PostFormBody(read_multipart(multipart).await?));
        }

        Ok(PostFormBody(PostForm::default()))
    }
}

fn text_slot<'a>(form: &'a mut PostForm, name: &str) -> Option<&'a mut Option<String>> {
    match name {
        "post_id" => Some(&mut form.post_id),
        "platform" => Some(&mut form.platform),
        "country" => Some(&mut form.country),
        "status" => Some(&mut form.status),
        _ => None,
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<PostForm, AppError> {
    let mut form = PostForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            // Only file parts count as an image
            let Some(file_name) = field.file_name().map(str::to_string) else {
                continue;
            };
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            if form.image.is_none() {
                form.image = Some(ImageUpload {
                    file_name,
                    content_type,
                    data,
                });
            }
            continue;
        }

        if text_slot(&mut form, &name).is_none() {
            continue;
        }
        let value = field.text().await?;
        if let Some(slot) = text_slot(&mut form, &name) {
            slot.get_or_insert(value);
        }
    }

    Ok(form)
}
