//! Multipart forms for the upload API

use crate::transport::{FormField, FormValue};
use crate::types::UploadOptions;
use bytes::Bytes;
use std::path::Path;

/// Fields of a direct upload to `/base/`
pub fn upload_form(public_key: &str, data: Bytes, options: &UploadOptions) -> Vec<FormField> {
    vec![
        FormField::text("UPLOADCARE_PUB_KEY", public_key),
        FormField::text("UPLOADCARE_STORE", options.store.as_form_value()),
        FormField {
            name: "file".to_string(),
            value: FormValue::File {
                data,
                filename: options.filename.clone(),
                content_type: options.content_type.clone(),
            },
        },
    ]
}

/// Fields of a group creation request to `/group/`
pub fn group_form<S: AsRef<str>>(public_key: &str, files: &[S]) -> Vec<FormField> {
    let mut fields = Vec::with_capacity(files.len() + 1);
    fields.push(FormField::text("pub_key", public_key));
    for (i, file) in files.iter().enumerate() {
        fields.push(FormField::text(format!("files[{}]", i), file.as_ref()));
    }
    fields
}

/// Fill in a file name from `path` when none was given
pub fn options_for_path(path: &Path, mut options: UploadOptions) -> UploadOptions {
    if options.filename.is_none() {
        options.filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
    }
    options
}
