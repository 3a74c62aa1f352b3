//! Repository URL handling: normalization, credential embedding and scrubbing.

use url::Url;

const SCHEME_SEPARATOR: &str = "://";
const REDACTED: &str = "***";

/// Turn `owner/repo`, `github.com/owner/repo` or a full URL into `https://.../.git`.
pub fn normalize_repo_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    if trimmed.is_empty() {
        return String::new();
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains('/') && !trimmed.contains('@') {
        let path = trimmed.strip_prefix("github.com/").unwrap_or(trimmed);
        format!("https://github.com/{}", path)
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&candidate) {
        Ok(mut url) => {
            let path = url.path().trim_end_matches('/').to_string();
            if !path.is_empty() {
                url.set_path(&format!("{}.git", path));
            }
            url.into()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Repository URL does not parse, using it as given");
            format!("{}.git", candidate)
        }
    }
}

/// Directory-safe name derived from a repository URL. Credentials never end up in the name.
pub fn sanitize_repo_name(url: &str) -> String {
    let name = match Url::parse(url) {
        Ok(parsed) => {
            let mut name = parsed.host_str().unwrap_or_default().to_string();
            if let Some(port) = parsed.port() {
                name.push_str(&format!(":{}", port));
            }
            name.push_str(parsed.path());
            name
        }
        Err(_) => url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url)
            .to_string(),
    };
    let name = name.strip_suffix(".git").unwrap_or(&name);
    name.replace(['/', ':', '@'], "_")
}

/// Embed `username:token` in the URL, replacing any credentials already present.
/// Reserved characters in either part are percent-encoded.
/// Returns the URL untouched unless both parts are non-empty and the URL parses.
pub fn authenticated_url(url: &str, username: &str, token: &str) -> String {
    if username.is_empty() || token.is_empty() {
        return url.to_string();
    }
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.set_username(username).is_err() || parsed.set_password(Some(token)).is_err() {
        return url.to_string();
    }
    parsed.into()
}

/// Repository URL with any credentials replaced by `***`.
pub fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.username().is_empty() && parsed.password().is_none() {
                return parsed.into();
            }
            if parsed.set_username(REDACTED).is_err() || parsed.set_password(None).is_err() {
                return scrub_credentials(url);
            }
            parsed.into()
        }
        Err(_) => scrub_credentials(url),
    }
}

/// Replace the credential segment of every URL in `text` with `***`.
///
/// A URL runs to the next whitespace or quote; its credential segment ends at the last `@`, so
/// a password holding `/`, `?` or `#` is still covered.
pub fn scrub_credentials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(SCHEME_SEPARATOR) {
        let (head, tail) = rest.split_at(pos + SCHEME_SEPARATOR.len());
        out.push_str(head);

        let url_end = tail
            .find(|c: char| c.is_whitespace() || c == '\'' || c == '"')
            .unwrap_or(tail.len());
        let url = &tail[..url_end];
        match url.rfind('@') {
            Some(at) => {
                out.push_str(REDACTED);
                out.push_str(&url[at..]);
            }
            None => out.push_str(url),
        }
        rest = &tail[url_end..];
    }

    out.push_str(rest);
    out
}
