//! HTML rendering for listings and forms.

use std::fmt::Write as _;

use axum::http::StatusCode;

use crate::auth::AccessConfig;
use crate::registry::{Folder, SharedFile};

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
li{margin:.25rem 0}.meta{color:#666;font-size:.9em}form{margin:1rem 0}";

/// Escape text for HTML element and attribute content.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Human-readable size.
pub fn format_size(size: Option<u64>) -> String {
    let Some(size) = size else {
        return "unknown size".to_string();
    };

    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if size < 1024 {
        return format!("{size} B");
    }

    let mut value = size as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title><style>{STYLE}</style></head>\
         <body>{body}</body></html>\n",
        title = escape(title),
    )
}

fn logout_form() -> &'static str {
    "<form method=\"post\" action=\"/logout\"><button type=\"submit\">Log out</button></form>"
}

/// Root listing of all shared folders.
pub fn folder_index(folders: &[(Folder, i64)], access: &AccessConfig) -> String {
    let mut body = String::from("<h1>Shared folders</h1>");

    if folders.is_empty() {
        body.push_str("<p>Nothing is shared yet.</p>");
    } else {
        body.push_str("<ul>");
        for (folder, count) in folders {
            let _ = write!(
                body,
                "<li><a href=\"/{id}\">{name}</a> <span class=\"meta\">{count} file{plural}</span></li>",
                id = folder.id,
                name = escape(&folder.name),
                plural = if *count == 1 { "" } else { "s" },
            );
        }
        body.push_str("</ul>");
    }

    if access.require_login {
        body.push_str(logout_form());
    }

    page("Shared folders", &body)
}

/// Listing of one folder's files.
pub fn file_list(folder: &Folder, files: &[SharedFile], allow_uploads: bool) -> String {
    let mut body = format!(
        "<p><a href=\"/\">&larr; All folders</a></p><h1>{}</h1>",
        escape(&folder.name)
    );

    if files.is_empty() {
        body.push_str("<p>This folder is empty.</p>");
    } else {
        body.push_str("<ul>");
        for file in files {
            let _ = write!(
                body,
                "<li><a href=\"/{folder_id}/{file_id}\">{name}</a> <span class=\"meta\">{size}</span></li>",
                folder_id = folder.id,
                file_id = file.id,
                name = escape(&file.name),
                size = format_size(file.known_size()),
            );
        }
        body.push_str("</ul>");
    }

    if allow_uploads {
        let _ = write!(
            body,
            "<form method=\"post\" action=\"/{}/upload\" enctype=\"multipart/form-data\">\
             <input type=\"file\" name=\"file\" required> <button type=\"submit\">Upload</button></form>",
            folder.id
        );
    }

    page(&folder.name, &body)
}

/// Login form, optionally with an error message.
pub fn login_page(message: Option<&str>) -> String {
    let mut body = String::from("<h1>Log in</h1>");
    if let Some(message) = message {
        let _ = write!(body, "<p class=\"error\">{}</p>", escape(message));
    }
    body.push_str(
        "<form method=\"post\" action=\"/login\">\
         <input type=\"password\" name=\"password\" placeholder=\"Password\" autofocus required> \
         <button type=\"submit\">Log in</button></form>",
    );
    page("Log in", &body)
}

/// Generic error page.
pub fn error_page(status: StatusCode, message: &str) -> String {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let body = format!(
        "<h1>{}</h1><p>{}</p><p><a href=\"/\">Back to shared folders</a></p>",
        escape(&title),
        escape(message)
    );
    page(&title, &body)
}
