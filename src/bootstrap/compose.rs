//! Compose file inspection and image pinning.
//!
//! Images are detected with `serde_yaml`, but rewrites are line-level so
//! comments, ordering and formatting of the file survive untouched.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: BTreeMap<String, ComposeService>,
}

#[derive(Debug, Deserialize)]
struct ComposeService {
    image: Option<String>,
}

/// One service's declared image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceImage {
    /// Compose service name.
    pub service: String,
    /// Image reference as written.
    pub image: String,
}

/// List `(service, image)` pairs, sorted by service name.
///
/// Services that build from source (no `image:`) are skipped.
///
/// # Errors
///
/// Returns the YAML decoder message if `content` is not a compose file.
pub fn detect_images(content: &str) -> Result<Vec<ServiceImage>, String> {
    let compose: ComposeFile = serde_yaml::from_str(content).map_err(|e| e.to_string())?;

    Ok(compose
        .services
        .into_iter()
        .filter_map(|(service, definition)| {
            definition
                .image
                .map(|image| image.trim().to_string())
                .filter(|image| !image.is_empty())
                .map(|image| ServiceImage { service, image })
        })
        .collect())
}

/// Split `image_ref` into repository, tag and digest.
fn split_reference(image_ref: &str) -> (&str, Option<&str>, Option<&str>) {
    let (name, digest) = match image_ref.split_once('@') {
        Some((name, digest)) => (name, Some(digest)),
        None => (image_ref, None),
    };

    // A ':' before the last '/' belongs to a registry port, not a tag
    let last_slash = name.rfind('/').map_or(0, |i| i + 1);
    match name[last_slash..].rfind(':') {
        Some(colon) => {
            let colon = last_slash + colon;
            (&name[..colon], Some(&name[colon + 1..]), digest)
        }
        None => (name, None, digest),
    }
}

/// True if the reference has no digest and no tag other than `latest`.
#[must_use]
pub fn is_unpinned(image_ref: &str) -> bool {
    match split_reference(image_ref) {
        (_, _, Some(_)) => false,
        (_, None, None) => true,
        (_, Some(tag), None) => tag == "latest",
    }
}

/// Normalized repository used to select a resolver, e.g. `nextcloud` for
/// `docker.io/library/nextcloud:latest`.
#[must_use]
pub fn image_family(image_ref: &str) -> String {
    let (repository, _, _) = split_reference(image_ref);
    let repository = repository
        .strip_prefix("docker.io/")
        .or_else(|| repository.strip_prefix("index.docker.io/"))
        .unwrap_or(repository);
    repository
        .strip_prefix("library/")
        .unwrap_or(repository)
        .to_lowercase()
}

/// `image_ref` with its tag replaced by `version`.
#[must_use]
pub fn pin_reference(image_ref: &str, version: &str) -> String {
    let (repository, _, _) = split_reference(image_ref);
    format!("{repository}:{version}")
}

/// True if `tag` is a valid image tag.
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    tag.len() <= 128
        && (first.is_ascii_alphanumeric() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Replace `image:` values found in `replacements`; returns the new text and
/// the number of lines changed.
#[must_use]
pub fn rewrite_images(content: &str, replacements: &HashMap<String, String>) -> (String, usize) {
    let mut changed = 0;
    let mut lines = Vec::new();

    for line in content.lines() {
        match rewrite_image_line(line, replacements) {
            Some(updated) => {
                changed += 1;
                lines.push(updated);
            }
            None => lines.push(line.to_string()),
        }
    }

    let mut output = lines.join("\n");
    if content.ends_with('\n') {
        output.push('\n');
    }
    (output, changed)
}

fn rewrite_image_line(line: &str, replacements: &HashMap<String, String>) -> Option<String> {
    let indent_len = line.len() - line.trim_start().len();
    let (indent, body) = line.split_at(indent_len);
    let value = body.strip_prefix("image:")?;

    let (value, comment) = match value.find(" #") {
        Some(i) => value.split_at(i),
        None => (value, ""),
    };
    let trimmed_end = value.trim_end();
    let spacing = &value[trimmed_end.len()..];
    let value = trimmed_end.trim_start();
    let (quote, bare) = if let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        ("\"", inner)
    } else if let Some(inner) = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
    {
        ("'", inner)
    } else {
        ("", value)
    };

    let pinned = replacements.get(bare)?;
    Some(format!("{indent}image: {quote}{pinned}{quote}{spacing}{comment}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const COMPOSE: &str = "# Nextcloud stack\nservices:\n  app:\n    image: nextcloud  # web\n    ports:\n      - \"8080:80\"\n  db:\n    image: \"postgres:16\"\n  cache:\n    image: 'redis:latest'\n  builder:\n    build: .\n";

    #[test]
    fn test_detect_images_skips_build_only_services() {
        let images = detect_images(COMPOSE).unwrap();
        assert_eq!(
            images,
            vec![
                ServiceImage {
                    service: "app".into(),
                    image: "nextcloud".into()
                },
                ServiceImage {
                    service: "cache".into(),
                    image: "redis:latest".into()
                },
                ServiceImage {
                    service: "db".into(),
                    image: "postgres:16".into()
                },
            ]
        );
    }

    #[test]
    fn test_detect_images_invalid_yaml() {
        assert!(detect_images("services: [").is_err());
    }

    #[test_case("nextcloud", true)]
    #[test_case("nextcloud:latest", true)]
    #[test_case("nextcloud:29.0.3", false)]
    #[test_case("nextcloud@sha256:abc", false)]
    #[test_case("registry.local:5000/team/app", true)]
    #[test_case("registry.local:5000/team/app:1.2", false)]
    fn test_is_unpinned(image: &str, expected: bool) {
        assert_eq!(is_unpinned(image), expected);
    }

    #[test_case("nextcloud:latest", "nextcloud")]
    #[test_case("docker.io/library/nextcloud", "nextcloud")]
    #[test_case("linuxserver/Jellyfin:latest", "linuxserver/jellyfin")]
    #[test_case("registry.local:5000/team/app", "registry.local:5000/team/app")]
    fn test_image_family(image: &str, expected: &str) {
        assert_eq!(image_family(image), expected);
    }

    #[test]
    fn test_pin_reference() {
        assert_eq!(pin_reference("nextcloud:latest", "29.0.3"), "nextcloud:29.0.3");
        assert_eq!(
            pin_reference("registry.local:5000/app", "1.0"),
            "registry.local:5000/app:1.0"
        );
    }

    #[test_case("29.0.3", true)]
    #[test_case("v1_beta-2", true)]
    #[test_case("", false)]
    #[test_case(".hidden", false)]
    #[test_case("1.0 beta", false)]
    fn test_is_valid_tag(tag: &str, expected: bool) {
        assert_eq!(is_valid_tag(tag), expected);
    }

    #[test]
    fn test_rewrite_preserves_everything_else() {
        let replacements = HashMap::from([
            ("nextcloud".to_string(), "nextcloud:29.0.3".to_string()),
            ("redis:latest".to_string(), "redis:7.2.4".to_string()),
        ]);

        let (rewritten, changed) = rewrite_images(COMPOSE, &replacements);

        assert_eq!(changed, 2);
        assert_eq!(
            rewritten,
            COMPOSE
                .replace("image: nextcloud  # web", "image: nextcloud:29.0.3  # web")
                .replace("image: 'redis:latest'", "image: 'redis:7.2.4'")
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let replacements =
            HashMap::from([("nextcloud".to_string(), "nextcloud:29.0.3".to_string())]);
        let (once, _) = rewrite_images(COMPOSE, &replacements);
        let (twice, changed) = rewrite_images(&once, &replacements);
        assert_eq!(once, twice);
        assert_eq!(changed, 0);
    }
}
