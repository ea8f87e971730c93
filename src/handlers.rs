use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse, Result};
use futures_util::StreamExt;

use crate::classifier::Classifier;
use crate::models::AnalyzeResponse;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Face Recognition</title></head>
<body>
  <h1>Face Recognition</h1>
  <p>POST an image to <code>/analyze</code> as multipart field <code>file</code>.</p>
  <form action="/analyze" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept="image/*">
    <input type="submit" value="Analyze">
  </form>
</body>
</html>
"#;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn analyze(
    classifier: web::Data<Classifier>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let image_bytes = read_file_field(&mut payload).await?;

    let classifier = classifier.into_inner();
    let prediction = web::block(move || classifier.predict(&image_bytes))
        .await?
        .map_err(|e| {
            log::error!("analysis failed: {e:#}");
            actix_web::error::ErrorInternalServerError("analysis failed")
        })?;

    Ok(HttpResponse::Ok().json(AnalyzeResponse::from(prediction)))
}

/// Reads the multipart field named `file` into memory.
async fn read_file_field(payload: &mut Multipart) -> Result<Vec<u8>, Error> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field.name() != "file" {
            continue;
        }

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            data.extend_from_slice(&chunk?);
        }
        return Ok(data);
    }

    log::error!("multipart upload without a \"file\" field");
    Err(actix_web::error::ErrorInternalServerError(
        "missing file field",
    ))
}
